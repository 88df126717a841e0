use std::borrow::Cow;
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engines::SpeechError;

use super::engine::PiperConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run Piper once and return the raw PCM16 it writes to stdout.
///
/// The child is killed once `config.timeout` elapses. A child that exits
/// before reading all of stdin is judged by its exit status and stderr.
pub fn run_piper(config: &PiperConfig, input: &str) -> Result<Vec<u8>, SpeechError> {
    let bin = &config.bin_path;
    let mut child = Command::new(bin)
        .arg("-q")
        .arg("-m")
        .arg(&config.model_path)
        .args(["-f", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SpeechError::BinaryNotFound(bin.display().to_string())
            } else {
                SpeechError::Io(e)
            }
        })?;

    // Piper reads line by line; an unterminated last line is not spoken.
    let stdin_payload = canonicalize_stdin_payload(input).into_owned();
    let writer = child.stdin.take().map(|mut stdin| {
        thread::spawn(move || stdin.write_all(stdin_payload.as_bytes()))
    });
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let Some(status) = wait_with_deadline(&mut child, config.timeout)? else {
        // Reader threads are left to finish on their own once the pipes close.
        return Err(SpeechError::BackendFailed {
            backend: config.name.clone(),
            message: format!("timed out after {:.1?}", config.timeout),
        });
    };

    let write_result = writer.map(join).transpose()?.unwrap_or(Ok(()));
    let stdout = stdout.map(join).transpose()?.unwrap_or(Ok(Vec::new()))?;
    let stderr = stderr.map(join).transpose()?.unwrap_or(Ok(Vec::new()))?;

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(SpeechError::BackendFailed {
            backend: config.name.clone(),
            message: format!("exited with code {:?}: {}", status.code(), stderr.trim()),
        });
    }

    match write_result {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            log::warn!("Piper exited before reading all input");
        }
        other => other?,
    }

    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join<T>(handle: JoinHandle<T>) -> Result<T, SpeechError> {
    handle.join().map_err(|_| {
        SpeechError::Io(std::io::Error::new(
            ErrorKind::Other,
            "piper pipe thread panicked",
        ))
    })
}

/// Wait for the child to exit. `None` means the deadline passed and the
/// child was killed.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<ExitStatus>, SpeechError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            log::warn!("Piper still running after {timeout:?}, killing it");
            // The child may have exited between the poll and the kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Collapse the text onto a single newline-terminated line.
fn canonicalize_stdin_payload(input: &str) -> Cow<'_, str> {
    let single_line = !input.trim_end_matches('\n').contains(|c: char| c == '\n' || c == '\r');
    if single_line && input.ends_with('\n') && !input.ends_with("\n\n") {
        Cow::Borrowed(input)
    } else {
        let joined = input.split_whitespace().collect::<Vec<_>>().join(" ");
        Cow::Owned(format!("{joined}\n"))
    }
}

/// Write an executable shell script standing in for Piper.
#[cfg(all(test, unix))]
pub(crate) fn write_fake_piper(tag: &str, script: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join(format!("tone-drill-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    let bin = dir.join("fake-piper");
    std::fs::write(&bin, format!("#!/bin/sh\n{script}\n")).expect("write fake piper");
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755))
        .expect("make fake piper executable");
    bin
}

#[cfg(test)]
mod tests {
    use super::{canonicalize_stdin_payload, run_piper};
    use crate::engines::piper::PiperConfigBuilder;
    use crate::engines::SpeechError;
    use std::borrow::Cow;
    use std::time::{Duration, Instant};

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(canonicalize_stdin_payload("你好"), "你好\n");
    }

    #[test]
    fn keeps_single_trailing_newline_for_stdin() {
        assert!(matches!(
            canonicalize_stdin_payload("你好\n"),
            Cow::Borrowed("你好\n")
        ));
    }

    #[test]
    fn joins_multiple_lines_into_one() {
        assert_eq!(canonicalize_stdin_payload("你好\n中国\r\n"), "你好 中国\n");
    }

    #[test]
    fn missing_binary_is_reported() {
        let config = PiperConfigBuilder::default()
            .bin_path("/nonexistent/piper-tts-binary")
            .model_path("model.onnx")
            .build()
            .unwrap();
        let err = run_piper(&config, "你好").unwrap_err();
        assert!(matches!(err, SpeechError::BinaryNotFound(_)), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn early_exit_reports_stderr_instead_of_broken_pipe() {
        let bin = super::write_fake_piper(
            "early-exit",
            "echo 'Unable to load model' >&2\nexit 3",
        );
        let config = PiperConfigBuilder::default()
            .bin_path(bin)
            .model_path("voice.onnx")
            .name("piper local")
            .build()
            .unwrap();
        // Larger than a pipe buffer, so the write cannot finish before the exit.
        let long_text = "你".repeat(100_000);

        match run_piper(&config, &long_text) {
            Err(SpeechError::BackendFailed { backend, message }) => {
                assert_eq!(backend, "piper local");
                assert!(message.contains("Some(3)"), "{message}");
                assert!(message.contains("Unable to load model"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn hung_process_is_killed_at_the_deadline() {
        let bin = super::write_fake_piper("hung", "cat >/dev/null\nexec sleep 30");
        let config = PiperConfigBuilder::default()
            .bin_path(bin)
            .model_path("voice.onnx")
            .name("slow piper")
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let started = Instant::now();
        let err = run_piper(&config, "你好").unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10), "{:?}", started.elapsed());
        match err {
            SpeechError::BackendFailed { backend, message } => {
                assert_eq!(backend, "slow piper");
                assert!(message.contains("timed out"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
