/// MIDI output using midir, General MIDI drum map on channel 10
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fractal::NoteSymbol;
use crate::sequencer::playback::NoteTrigger;

const CLIENT_NAME: &str = "Fractal Drums MIDI Output";

/// Status bytes for channel 10 (index 9), the GM percussion channel.
const DRUM_NOTE_ON: u8 = 0x99;
const DRUM_NOTE_OFF: u8 = 0x89;

pub const DEFAULT_VELOCITY: u8 = 100;

/// GM percussion key for a symbol. Rests have none.
pub fn gm_drum_note(symbol: NoteSymbol) -> Option<u8> {
    match symbol {
        NoteSymbol::Bass => Some(36),
        NoteSymbol::Snare => Some(38),
        NoteSymbol::HiHat => Some(42),
        NoteSymbol::Rest => None,
    }
}

pub fn note_on_message(note: u8, velocity: u8) -> [u8; 3] {
    [DRUM_NOTE_ON, note & 0x7f, velocity & 0x7f]
}

pub fn note_off_message(note: u8) -> [u8; 3] {
    [DRUM_NOTE_OFF, note & 0x7f, 0]
}

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
    velocity: u8,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            port_name: None,
            velocity: DEFAULT_VELOCITY,
        }
    }

    pub fn available_ports() -> Vec<String> {
        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                warn!("MIDI unavailable: {}", e);
                vec![]
            }
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| Error::Midi(format!("failed to create MIDI output: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| Error::Midi(format!("invalid port index {}", port_index)))?;
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| format!("port {}", port_index));

        let connection = midi_out
            .connect(port, "fractal-drums")
            .map_err(|e| Error::Midi(format!("failed to connect: {}", e)))?;

        info!(port = %name, "MIDI output connected");
        self.connection = Some(connection);
        self.port_name = Some(name);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity.min(127);
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        if let Some(ref mut conn) = self.connection {
            conn.send(message)
                .map_err(|e| Error::Midi(format!("failed to send: {}", e)))?;
        }
        Ok(())
    }

    pub fn send_note_on(&mut self, note: u8, velocity: u8) -> Result<()> {
        self.send(&note_on_message(note, velocity))
    }

    pub fn send_note_off(&mut self, note: u8) -> Result<()> {
        self.send(&note_off_message(note))
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
            info!("MIDI output disconnected");
        }
        self.port_name = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Drum hits are one-shots, so note-off follows immediately.
impl NoteTrigger for MidiOutputDevice {
    fn trigger(&mut self, symbol: NoteSymbol) {
        if !self.is_connected() {
            return;
        }
        let Some(note) = gm_drum_note(symbol) else {
            return;
        };
        let velocity = self.velocity;
        if let Err(e) = self
            .send_note_on(note, velocity)
            .and_then(|_| self.send_note_off(note))
        {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gm_drum_map() {
        assert_eq!(gm_drum_note(NoteSymbol::Bass), Some(36));
        assert_eq!(gm_drum_note(NoteSymbol::Snare), Some(38));
        assert_eq!(gm_drum_note(NoteSymbol::HiHat), Some(42));
        assert_eq!(gm_drum_note(NoteSymbol::Rest), None);
    }

    #[test]
    fn test_messages_use_channel_ten() {
        assert_eq!(note_on_message(36, 100), [0x99, 36, 100]);
        assert_eq!(note_off_message(42), [0x89, 42, 0]);
        assert_eq!(note_on_message(200, 255), [0x99, 200 & 0x7f, 127]);
    }

    #[test]
    fn test_disconnected_device_is_silent() {
        let mut device = MidiOutputDevice::default();
        assert!(!device.is_connected());
        assert!(device.send_note_on(36, 100).is_ok());
        device.trigger(NoteSymbol::Bass);
        device.disconnect();
        assert!(device.port_name().is_none());
    }

    #[test]
    fn test_velocity_clamped() {
        let mut device = MidiOutputDevice::new();
        assert_eq!(device.velocity(), DEFAULT_VELOCITY);
        device.set_velocity(200);
        assert_eq!(device.velocity(), 127);
    }
}
