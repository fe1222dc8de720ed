/// Audio output using cpal - one-shot drum samples picked at random per hit
use std::path::Path;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::DrumKit;
use crate::error::{Error, Result};
use crate::fractal::NoteSymbol;
use crate::sequencer::playback::NoteTrigger;

/// Hard cap on overlapping hits; the oldest voice is dropped beyond it.
const MAX_VOICES: usize = 32;

const VOICE_GAIN: f32 = 0.5;

/// Decoded mono sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

/// Read a WAV file and fold its channels down to mono.
pub fn load_wav(path: &Path) -> Result<Sample> {
    let to_error = |source| Error::Sample {
        path: path.to_path_buf(),
        source,
    };
    let reader = hound::WavReader::open(path).map_err(to_error)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(to_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(to_error)?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let frames = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(Sample {
        frames,
        sample_rate: spec.sample_rate,
    })
}

/// Loaded sample pools, one per audible symbol.
#[derive(Debug, Clone, Default)]
pub struct DrumSamples {
    bass: Vec<Arc<Sample>>,
    snare: Vec<Arc<Sample>>,
    hihat: Vec<Arc<Sample>>,
}

impl DrumSamples {
    /// Load every sample of the kit. Unreadable files are logged and skipped,
    /// leaving that pool smaller (or silent when empty).
    pub fn load(kit: &DrumKit) -> Self {
        let load_pool = |paths: &[std::path::PathBuf]| -> Vec<Arc<Sample>> {
            paths
                .iter()
                .filter_map(|path| match load_wav(path) {
                    Ok(sample) => Some(Arc::new(sample)),
                    Err(e) => {
                        warn!("skipping sample: {}", e);
                        None
                    }
                })
                .collect()
        };
        Self {
            bass: load_pool(&kit.bass),
            snare: load_pool(&kit.snare),
            hihat: load_pool(&kit.hihat),
        }
    }

    pub fn from_pools(bass: Vec<Sample>, snare: Vec<Sample>, hihat: Vec<Sample>) -> Self {
        let wrap = |pool: Vec<Sample>| pool.into_iter().map(Arc::new).collect();
        Self {
            bass: wrap(bass),
            snare: wrap(snare),
            hihat: wrap(hihat),
        }
    }

    pub fn pool(&self, symbol: NoteSymbol) -> &[Arc<Sample>] {
        match symbol {
            NoteSymbol::Bass => &self.bass,
            NoteSymbol::Snare => &self.snare,
            NoteSymbol::HiHat => &self.hihat,
            NoteSymbol::Rest => &[],
        }
    }

    /// Uniform pick from the symbol's pool. `None` for rests and empty pools.
    pub fn pick<R: Rng + ?Sized>(&self, symbol: NoteSymbol, rng: &mut R) -> Option<Arc<Sample>> {
        self.pool(symbol).choose(rng).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.bass.is_empty() && self.snare.is_empty() && self.hihat.is_empty()
    }
}

/// A sample being played back at a fixed resampling step.
struct Voice {
    sample: Arc<Sample>,
    position: f64,
    step: f64,
}

impl Voice {
    fn finished(&self) -> bool {
        self.position as usize >= self.sample.frames.len()
    }
}

#[derive(Default)]
struct MixerState {
    voices: Vec<Voice>,
}

impl MixerState {
    fn start(&mut self, sample: Arc<Sample>, output_rate: u32) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        let step = sample.sample_rate as f64 / output_rate.max(1) as f64;
        self.voices.push(Voice {
            sample,
            position: 0.0,
            step,
        });
    }

    /// Mix all voices into interleaved `data`, same signal on every channel.
    fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let mut out = 0.0f32;
            for voice in &mut self.voices {
                if let Some(&value) = voice.sample.frames.get(voice.position as usize) {
                    out += value * VOICE_GAIN;
                }
                voice.position += voice.step;
            }
            let out = out.clamp(-1.0, 1.0);
            for sample in frame.iter_mut() {
                *sample = out;
            }
        }
        self.voices.retain(|voice| !voice.finished());
    }
}

pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    state: Arc<Mutex<MixerState>>,
    samples: DrumSamples,
    output_rate: u32,
    rng: StdRng,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn new(samples: DrumSamples) -> Result<Self> {
        let state = Arc::new(Mutex::new(MixerState::default()));
        let (stream, output_rate) = Self::setup_audio_stream(Arc::clone(&state))?;
        Ok(Self {
            stream: Some(stream),
            state,
            samples,
            output_rate,
            rng: StdRng::from_entropy(),
        })
    }

    /// An output that accepts triggers but never makes a sound.
    pub fn disabled(samples: DrumSamples) -> Self {
        Self {
            stream: None,
            state: Arc::new(Mutex::new(MixerState::default())),
            samples,
            output_rate: 44_100,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.stream.is_some()
    }

    pub fn samples(&self) -> &DrumSamples {
        &self.samples
    }

    fn setup_audio_stream(state: Arc<Mutex<MixerState>>) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no default output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        match state.lock() {
                            Ok(mut mixer) => mixer.render(data, channels),
                            Err(_) => data.fill(0.0),
                        }
                    },
                    |err| warn!("audio stream error: {}", err),
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?,
            other => {
                return Err(Error::Audio(format!(
                    "unsupported sample format {:?} (only f32)",
                    other
                )))
            }
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        Ok((stream, sample_rate))
    }
}

impl NoteTrigger for AudioOutput {
    fn trigger(&mut self, symbol: NoteSymbol) {
        let Some(sample) = self.samples.pick(symbol, &mut self.rng) else {
            return;
        };
        if let Ok(mut mixer) = self.state.lock() {
            mixer.start(sample, self.output_rate);
            debug!(?symbol, voices = mixer.voices.len(), "sample triggered");
        }
    }
}
