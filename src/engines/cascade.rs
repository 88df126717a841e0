use crate::{SpeechBackend, SynthesisResult};

use super::SpeechError;

/// Audio produced by a cascade, and which backend produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spoken {
    pub backend: String,
    pub audio: SynthesisResult,
}

/// Speech backends in priority order.
///
/// [`speak`](SpeechCascade::speak) skips backends that report themselves unavailable and falls
/// through to the next one on error. The first success wins.
#[derive(Default)]
pub struct SpeechCascade {
    backends: Vec<Box<dyn SpeechBackend>>,
}

impl SpeechCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend at the lowest priority.
    pub fn with_backend(mut self, backend: impl SpeechBackend + 'static) -> Self {
        self.push(backend);
        self
    }

    pub fn push(&mut self, backend: impl SpeechBackend + 'static) {
        self.backends.push(Box::new(backend));
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn speak(&self, text: &str) -> Result<Spoken, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            let name = backend.name();
            if !backend.is_available() {
                log::debug!("Speech backend '{name}' unavailable, skipping");
                continue;
            }
            match backend.synthesize(text) {
                Ok(audio) => {
                    log::info!(
                        "Spoke {} chars with '{name}' ({:.2}s of audio)",
                        text.chars().count(),
                        audio.duration_secs()
                    );
                    return Ok(Spoken {
                        backend: name.to_string(),
                        audio,
                    });
                }
                Err(err) => {
                    log::warn!("Speech backend '{name}' failed: {err}");
                    failures.push((name.to_string(), err));
                }
            }
        }

        Err(SpeechError::AllBackendsFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Fake {
        name: &'static str,
        available: bool,
        fails: bool,
        calls: Rc<Cell<u32>>,
    }

    impl Fake {
        fn new(name: &'static str, available: bool, fails: bool) -> (Self, Rc<Cell<u32>>) {
            let calls = Rc::new(Cell::new(0));
            let fake = Self {
                name,
                available,
                fails,
                calls: Rc::clone(&calls),
            };
            (fake, calls)
        }
    }

    impl SpeechBackend for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn synthesize(&self, text: &str) -> Result<SynthesisResult, SpeechError> {
            self.calls.set(self.calls.get() + 1);
            if self.fails {
                return Err(SpeechError::BackendFailed {
                    backend: self.name.to_string(),
                    message: format!("could not say {text}"),
                });
            }
            Ok(SynthesisResult {
                samples: vec![1, 2, 3],
                sample_rate: 22050,
            })
        }
    }

    #[test]
    fn first_working_backend_wins() {
        let (skipped, skipped_calls) = Fake::new("web voice", false, false);
        let (broken, broken_calls) = Fake::new("piper local", true, true);
        let (remote, remote_calls) = Fake::new("piper remote", true, false);
        let (never, never_calls) = Fake::new("spare", true, false);
        let cascade = SpeechCascade::new()
            .with_backend(skipped)
            .with_backend(broken)
            .with_backend(remote)
            .with_backend(never);

        let spoken = cascade.speak("  你好 ").expect("remote backend should answer");
        assert_eq!(spoken.backend, "piper remote");
        assert_eq!(spoken.audio.samples, vec![1, 2, 3]);
        assert_eq!(skipped_calls.get(), 0);
        assert_eq!(broken_calls.get(), 1);
        assert_eq!(remote_calls.get(), 1);
        assert_eq!(never_calls.get(), 0);
    }

    #[test]
    fn collects_every_failure() {
        let (a, _) = Fake::new("a", true, true);
        let (b, _) = Fake::new("b", true, true);
        let cascade = SpeechCascade::new().with_backend(a).with_backend(b);
        match cascade.speak("中") {
            Err(SpeechError::AllBackendsFailed(failures)) => {
                let names: Vec<&str> = failures.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, ["a", "b"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn blank_text_is_rejected_before_any_backend() {
        let (a, calls) = Fake::new("a", true, false);
        let cascade = SpeechCascade::new().with_backend(a);
        assert!(matches!(cascade.speak(" \n"), Err(SpeechError::EmptyText)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn empty_cascade_reports_no_backends() {
        let cascade = SpeechCascade::new();
        assert!(cascade.is_empty());
        let err = cascade.speak("中").unwrap_err();
        assert_eq!(
            err.to_string(),
            "All speech backends failed: no backends configured"
        );
    }
}
