//! # tone-drill
//!
//! A Rust library for practicing Mandarin tones: pinyin tone marking, tone
//! drills with scoring, and text-to-speech through a cascade of backends.
//!
//! ## Features
//!
//! - **Tone marking**: place the tone diacritic on the right vowel of a
//!   toneless syllable (`zhong` + 1 → `zhōng`)
//! - **Drills**: build a drill from Chinese text, record the learner's tones,
//!   grade them and reset
//! - **Speech**: try speech backends in priority order until one produces audio
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tone-drill = { version = "0.1", features = ["piper"] }
//! ```
//!
//! ```rust
//! use tone_drill::{apply_tone, Drill, DictionaryTranscriber, ToneDigit};
//!
//! assert_eq!(apply_tone("lv", Some(ToneDigit::Third)), "lǚ");
//!
//! let dict: DictionaryTranscriber = [('你', "ni3"), ('好', "hao3")].into_iter().collect();
//! let mut drill = Drill::build("你好", &dict);
//! drill.assign(0, ToneDigit::Third);
//! drill.assign(1, ToneDigit::Second);
//! assert_eq!(drill.score().to_string(), "1/2 (50%)");
//! ```

pub mod engines;
pub mod tone;
pub mod trainer;
pub mod transcription;

use std::io::Cursor;
use std::path::Path;

pub use engines::{SpeechCascade, SpeechError, Spoken};
pub use tone::{apply_tone, normalize_umlaut, strip_tone, ToneDigit, ToneParseError, ToneStyle};
pub use trainer::{
    check, reset_all, score, AnnotatedSyllable, Gradable, ScoreItem, ScoreResult, Syllable,
    Verdict,
};
pub use transcription::{is_han, DictionaryTranscriber, Drill, DrillLine, Ruby, Segment, Transcriber};

/// The result of a synthesis (text-to-speech) operation.
///
/// Mono 16-bit PCM samples and the sample rate they were produced at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    /// Raw audio samples
    pub samples: Vec<i16>,
    /// Sample rate of the audio (22050 for most Piper voices)
    pub sample_rate: u32,
}

impl SynthesisResult {
    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Build from raw little-endian PCM16 bytes. A trailing odd byte is dropped.
    pub fn from_pcm16_le(pcm: &[u8], sample_rate: u32) -> Self {
        let samples = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV file held in memory. Multi-channel audio is downmixed.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, hound::Error> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, bits) => {
                let shift = bits.saturating_sub(16);
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()?,
        };

        let channels = usize::from(spec.channels.max(1));
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Encode as a 16-bit mono WAV file in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Write the audio to a 16-bit mono WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec())?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for speech backends.
///
/// A backend is checked with [`is_available`](SpeechBackend::is_available)
/// before [`synthesize`](SpeechBackend::synthesize) is attempted; a
/// [`SpeechCascade`] tries backends in order until one succeeds.
pub trait SpeechBackend {
    /// Short label reported back to the caller, e.g. `"piper local"`.
    fn name(&self) -> &str;

    /// Cheap check that the backend could work at all.
    ///
    /// The default assumes availability and lets `synthesize` report failure.
    fn is_available(&self) -> bool {
        true
    }

    /// Synthesize speech from the given text.
    fn synthesize(&self, text: &str) -> Result<SynthesisResult, SpeechError>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(&self, text: &str, wav_path: &Path) -> Result<(), SpeechError> {
        self.synthesize(text)?.write_wav(wav_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SynthesisResult;

    #[test]
    fn decodes_little_endian_pcm() {
        let audio = SynthesisResult::from_pcm16_le(&[0x01, 0x00, 0xff, 0xff, 0x7f], 16000);
        assert_eq!(audio.samples, vec![1, -1]);
        assert_eq!(audio.sample_rate, 16000);
    }

    #[test]
    fn wav_bytes_keep_samples_and_rate() {
        let audio = SynthesisResult {
            samples: vec![0, 1200, -1200, i16::MAX, i16::MIN],
            sample_rate: 22050,
        };
        let bytes = audio.to_wav_bytes().expect("encode");
        assert_eq!(&bytes[..4], b"RIFF");
        let decoded = SynthesisResult::from_wav_bytes(&bytes).expect("decode");
        assert_eq!(decoded, audio);
    }

    #[test]
    fn stereo_wav_is_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for sample in [100i16, 300, -50, -150] {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        let decoded = SynthesisResult::from_wav_bytes(&cursor.into_inner()).unwrap();
        assert_eq!(decoded.samples, vec![200, -100]);
        assert_eq!(decoded.sample_rate, 8000);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let audio = SynthesisResult {
            samples: vec![0; 11025],
            sample_rate: 22050,
        };
        assert_eq!(audio.duration_secs(), 0.5);
        let silent = SynthesisResult {
            samples: Vec::new(),
            sample_rate: 0,
        };
        assert_eq!(silent.duration_secs(), 0.0);
    }
}
