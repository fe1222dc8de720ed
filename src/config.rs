/// Grid, tempo and drum kit configuration
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_NOTES_PER_MEASURE: u32 = 4;
pub const MAX_NOTES_PER_MEASURE: u32 = 32;
pub const MIN_BPM: u32 = 10;
pub const MAX_BPM: u32 = 1000;

/// Measure layout and tempo.
///
/// `notes_per_measure` is also the number of quaternary digits in a full
/// address. Two digits are consumed per subdivision level, so an odd count
/// leaves a final level that only splits the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    notes_per_measure: u32,
    bpm: u32,
    pub looping: bool,
}

impl GridConfig {
    pub fn new(notes_per_measure: u32, bpm: u32) -> Result<Self> {
        if !(MIN_NOTES_PER_MEASURE..=MAX_NOTES_PER_MEASURE).contains(&notes_per_measure) {
            return Err(Error::InvalidConfiguration {
                field: "notes_per_measure",
                value: notes_per_measure as i64,
            });
        }
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(Error::InvalidConfiguration {
                field: "bpm",
                value: bpm as i64,
            });
        }
        Ok(Self {
            notes_per_measure,
            bpm,
            looping: true,
        })
    }

    /// Same clamping the UI applies to raw input before it reaches the core.
    pub fn clamped(notes_per_measure: u32, bpm: u32) -> Self {
        Self {
            notes_per_measure: notes_per_measure.clamp(MIN_NOTES_PER_MEASURE, MAX_NOTES_PER_MEASURE),
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            looping: true,
        }
    }

    pub fn notes_per_measure(&self) -> u32 {
        self.notes_per_measure
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn set_notes_per_measure(&mut self, notes_per_measure: u32) -> Result<()> {
        *self = Self {
            looping: self.looping,
            ..Self::new(notes_per_measure, self.bpm)?
        };
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: u32) -> Result<()> {
        *self = Self {
            looping: self.looping,
            ..Self::new(self.notes_per_measure, bpm)?
        };
        Ok(())
    }

    /// Number of subdivision levels, counting a trailing x-only level.
    pub fn levels(&self) -> u32 {
        self.notes_per_measure.div_ceil(2)
    }

    /// Side length of the square canvas in world units, always a power of 4.
    pub fn canvas_size(&self) -> u64 {
        4u64.pow(self.levels())
    }

    pub fn address_length(&self) -> usize {
        self.notes_per_measure as usize
    }

    pub fn has_partial_level(&self) -> bool {
        self.notes_per_measure % 2 == 1
    }

    /// `floor(60000 / (notes_per_measure / 4) / bpm)`
    pub fn tick_interval_ms(&self) -> u64 {
        let notes_per_beat = self.notes_per_measure as f64 / 4.0;
        (60_000.0 / notes_per_beat / self.bpm as f64).floor() as u64
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            notes_per_measure: 16,
            bpm: 120,
            looping: true,
        }
    }
}

/// A time signature plus the note value one fractal digit stands for.
///
/// 4/4 played in eighths gives eight notes per measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub counts: u32,
    pub note_type: u32,
    pub fractal_note_type: u32,
}

impl TimeSignature {
    pub fn notes_per_measure(&self) -> Result<u32> {
        if self.note_type == 0 {
            return Err(Error::InvalidConfiguration {
                field: "note_type",
                value: 0,
            });
        }
        let notes = self.counts as f64 * self.fractal_note_type as f64 / self.note_type as f64;
        Ok(notes.round() as u32)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            counts: 4,
            note_type: 4,
            fractal_note_type: 8,
        }
    }
}

/// Sample pools for each sounding symbol. Rest has no pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumKit {
    pub bass: Vec<PathBuf>,
    pub snare: Vec<PathBuf>,
    pub hihat: Vec<PathBuf>,
}

impl DrumKit {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::KitIo {
            path: path.to_path_buf(),
            source,
        })?;
        let kit = Self::from_ron(&text)?;
        tracing::info!(
            ?path,
            bass = kit.bass.len(),
            snare = kit.snare.len(),
            hihat = kit.hihat.len(),
            "loaded drum kit"
        );
        Ok(kit)
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Resolve relative sample paths against `base`.
    pub fn rebased(mut self, base: &Path) -> Self {
        for pool in [&mut self.bass, &mut self.snare, &mut self.hihat] {
            for path in pool.iter_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
        self
    }
}

impl Default for DrumKit {
    fn default() -> Self {
        let pool = |names: [&str; 4]| {
            names
                .iter()
                .map(|name| PathBuf::from("amen-drum-kit").join(name))
                .collect()
        };
        Self {
            bass: pool([
                "26885__vexst__kick-1.wav",
                "26886__vexst__kick-2.wav",
                "26887__vexst__kick-3.wav",
                "26888__vexst__kick-4.wav",
            ]),
            snare: pool([
                "26900__vexst__snare-1.wav",
                "26901__vexst__snare-2.wav",
                "26902__vexst__snare-3.wav",
                "26903__vexst__snare-4.wav",
            ]),
            hihat: pool([
                "26879__vexst__closed-hi-hat-1.wav",
                "26880__vexst__closed-hi-hat-2.wav",
                "26881__vexst__closed-hi-hat-3.wav",
                "26882__vexst__closed-hi-hat-4.wav",
            ]),
        }
    }
}
