//! Speech over HTTP.
//!
//! Talks to any service that answers `GET <url>?text=<text>` with a WAV body,
//! such as a Piper bridge running on the same machine or a hosted one.
//!
//! ```rust,no_run
//! use tone_drill::engines::http::{HttpBackend, HttpBackendConfigBuilder};
//! use tone_drill::SpeechCascade;
//!
//! let cascade = SpeechCascade::new()
//!     .with_backend(HttpBackend::local_bridge())
//!     .with_backend(HttpBackend::new(
//!         HttpBackendConfigBuilder::default()
//!             .url("https://tts.example.com/tts")
//!             .name("piper remote")
//!             .build()?,
//!     ));
//! let spoken = cascade.speak("你好")?;
//! println!("spoken by {}", spoken.backend);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;

pub use engine::{HttpBackend, HttpBackendConfig, HttpBackendConfigBuilder, LOCAL_BRIDGE_URL};
