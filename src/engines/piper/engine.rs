use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::Deserialize;

use crate::engines::SpeechError;
use crate::{SpeechBackend, SynthesisResult};

use super::process::run_piper;

/// Sample rate assumed when the model metadata does not say.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

const DEFAULT_BIN: &str = "piper-tts";
const DEFAULT_VOICE: &str = ".local/share/piper-voices/zh_CN/zh_CN-huayan-medium.onnx";

/// Parameters for running Piper.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct PiperConfig {
    /// Piper executable. A bare name is looked up on PATH.
    #[builder(setter(into))]
    pub bin_path: PathBuf,
    /// Voice model (`.onnx`). Its `.onnx.json` sibling is read for the sample rate.
    #[builder(setter(into))]
    pub model_path: PathBuf,
    /// Override the sample rate instead of reading it from the model metadata.
    #[builder(setter(into, strip_option))]
    pub sample_rate: Option<u32>,
    /// Label reported by the cascade.
    #[builder(setter(into))]
    pub name: String,
    /// How long one Piper run may take before it is killed.
    pub timeout: Duration,
}

impl Default for PiperConfig {
    fn default() -> Self {
        let model_path = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(DEFAULT_VOICE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VOICE));
        Self {
            bin_path: PathBuf::from(DEFAULT_BIN),
            model_path,
            sample_rate: None,
            name: "piper local".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PiperConfig {
    /// Defaults overridden by `PIPER_BIN` and `PIPER_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(bin) = std::env::var_os("PIPER_BIN") {
            config.bin_path = PathBuf::from(bin);
        }
        if let Some(model) = std::env::var_os("PIPER_MODEL") {
            config.model_path = PathBuf::from(model);
        }
        config
    }

    /// Path of the model's metadata file (`<model>.json`).
    pub fn metadata_path(&self) -> PathBuf {
        let mut path = self.model_path.clone().into_os_string();
        path.push(".json");
        PathBuf::from(path)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelMetadata {
    sample_rate: Option<u32>,
    audio: Option<AudioMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct AudioMetadata {
    sample_rate: Option<u32>,
}

/// Read the sample rate from Piper model metadata, falling back to
/// [`DEFAULT_SAMPLE_RATE`] when the file is missing or has no rate.
pub fn detect_sample_rate(metadata_path: &Path) -> u32 {
    let metadata = std::fs::read_to_string(metadata_path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_json::from_str::<ModelMetadata>(&content).map_err(|e| e.to_string())
        });

    match metadata {
        Ok(meta) => meta
            .sample_rate
            .or_else(|| meta.audio.and_then(|audio| audio.sample_rate))
            .unwrap_or(DEFAULT_SAMPLE_RATE),
        Err(err) => {
            log::warn!(
                "Could not read Piper metadata {}: {err}; assuming {DEFAULT_SAMPLE_RATE} Hz",
                metadata_path.display()
            );
            DEFAULT_SAMPLE_RATE
        }
    }
}

/// Speech backend that shells out to Piper.
pub struct PiperBackend {
    config: PiperConfig,
    sample_rate: u32,
}

impl Default for PiperBackend {
    fn default() -> Self {
        Self::new(PiperConfig::from_env())
    }
}

impl PiperBackend {
    pub fn new(config: PiperConfig) -> Self {
        let sample_rate = config
            .sample_rate
            .unwrap_or_else(|| detect_sample_rate(&config.metadata_path()));
        log::info!(
            "Piper backend using {} with model {} at {sample_rate} Hz",
            config.bin_path.display(),
            config.model_path.display()
        );
        Self {
            config,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &PiperConfig {
        &self.config
    }
}

impl SpeechBackend for PiperBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_available(&self) -> bool {
        self.config.model_path.exists()
    }

    fn synthesize(&self, text: &str) -> Result<SynthesisResult, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let pcm = run_piper(&self.config, text)?;
        if pcm.len() < 2 {
            return Err(SpeechError::BackendFailed {
                backend: self.config.name.clone(),
                message: "no audio produced".to_string(),
            });
        }

        log::debug!("Piper produced {} bytes of PCM", pcm.len());
        Ok(SynthesisResult::from_pcm16_le(&pcm, self.sample_rate))
    }
}
