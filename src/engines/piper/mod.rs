//! Local Piper text-to-speech backend.
//!
//! Piper is run as a subprocess for every request: text goes in on stdin,
//! raw 16-bit little-endian PCM comes back on stdout.
//!
//! # System Requirements
//!
//! The `piper-tts` binary (or `piper`) and a voice model:
//! - **Linux**: `pipx install piper-tts`
//! - **Voices**: <https://huggingface.co/rhasspy/piper-voices>
//!
//! # Model Layout
//!
//! ```text
//! ~/.local/share/piper-voices/zh_CN/
//! ├── zh_CN-huayan-medium.onnx        # voice model
//! └── zh_CN-huayan-medium.onnx.json   # metadata, read for the sample rate
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use tone_drill::engines::piper::{PiperBackend, PiperConfigBuilder};
//! use tone_drill::SpeechBackend;
//! use std::path::PathBuf;
//!
//! let config = PiperConfigBuilder::default()
//!     .bin_path("piper")
//!     .model_path(PathBuf::from("voices/zh_CN-huayan-medium.onnx"))
//!     .build()?;
//! let backend = PiperBackend::new(config);
//! backend.synthesize_to_file("你好", &PathBuf::from("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod process;

pub use engine::{PiperBackend, PiperConfig, PiperConfigBuilder, DEFAULT_SAMPLE_RATE};
