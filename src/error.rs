/// Error type shared by the core, audio and MIDI layers
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {field} = {value}")]
    InvalidConfiguration { field: &'static str, value: i64 },

    #[error("failed to read drum kit {path:?}: {source}")]
    KitIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse drum kit: {0}")]
    KitParse(#[from] ron::error::SpannedError),

    #[error("failed to decode sample {path:?}: {source}")]
    Sample {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("audio output unavailable: {0}")]
    Audio(String),

    #[error("MIDI error: {0}")]
    Midi(String),
}

pub type Result<T> = std::result::Result<T, Error>;
