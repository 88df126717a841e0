//! Speech backends and the cascade that chooses between them.
//!
//! # Available Backends
//!
//! Enable backends via Cargo features:
//! - `piper` - local Piper TTS run as a subprocess (default)
//! - `remote` - any HTTP endpoint answering `GET ?text=` with WAV audio

mod cascade;

#[cfg(feature = "remote")]
pub mod http;
#[cfg(feature = "piper")]
pub mod piper;

pub use cascade::{SpeechCascade, Spoken};

#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error("Nothing to speak")]
    EmptyText,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audio error: {0}")]
    Audio(#[from] hound::Error),
    #[error("{0} not found. Install it or point the backend at its location.")]
    BinaryNotFound(String),
    #[error("{backend} failed: {message}")]
    BackendFailed { backend: String, message: String },
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("All speech backends failed: {}", summarize(.0))]
    AllBackendsFailed(Vec<(String, SpeechError)>),
}

fn summarize(failures: &[(String, SpeechError)]) -> String {
    if failures.is_empty() {
        return "no backends configured".to_string();
    }
    failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
