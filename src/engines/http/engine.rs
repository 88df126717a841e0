use std::io::Read;
use std::time::Duration;

use derive_builder::Builder;

use crate::engines::SpeechError;
use crate::{SpeechBackend, SynthesisResult};

/// Where a Piper bridge listens when run next to the application.
pub const LOCAL_BRIDGE_URL: &str = "http://127.0.0.1:8089/tts";

/// Responses larger than this are rejected.
const MAX_AUDIO_BYTES: u64 = 32 * 1024 * 1024;

/// Parameters for an HTTP speech endpoint.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct HttpBackendConfig {
    /// Endpoint URL; the text is sent as the `text` query parameter.
    #[builder(setter(into))]
    pub url: String,
    /// Label reported by the cascade.
    #[builder(setter(into))]
    pub name: String,
    /// Reject responses whose `Content-Type` does not mention audio.
    pub require_audio: bool,
    /// Timeout for the whole request.
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            url: LOCAL_BRIDGE_URL.to_string(),
            name: "piper local".to_string(),
            require_audio: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Speech backend that fetches WAV audio over HTTP.
pub struct HttpBackend {
    config: HttpBackendConfig,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    /// A bridge on `127.0.0.1:8089` with the default settings.
    pub fn local_bridge() -> Self {
        Self::new(HttpBackendConfig::default())
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn failed(&self, message: impl Into<String>) -> SpeechError {
        SpeechError::BackendFailed {
            backend: self.config.name.clone(),
            message: message.into(),
        }
    }
}

impl SpeechBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn synthesize(&self, text: &str) -> Result<SynthesisResult, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        log::debug!("Requesting speech from {}", self.config.url);
        let response = match self.agent.get(&self.config.url).query("text", text).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(self.failed(format!("HTTP status {code}")));
            }
            Err(err) => return Err(Box::new(err).into()),
        };

        if !(200..300).contains(&response.status()) {
            return Err(self.failed(format!("HTTP status {}", response.status())));
        }
        if self.config.require_audio && !is_audio_content_type(response.content_type()) {
            return Err(self.failed(format!(
                "expected audio, got content type {:?}",
                response.content_type()
            )));
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_AUDIO_BYTES)
            .read_to_end(&mut body)?;

        Ok(SynthesisResult::from_wav_bytes(&body)?)
    }
}

fn is_audio_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("audio")
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    #[test]
    fn recognizes_audio_content_types() {
        assert!(is_audio_content_type("audio/wav"));
        assert!(is_audio_content_type("Audio/X-WAV"));
        assert!(!is_audio_content_type("application/json"));
        assert!(!is_audio_content_type(""));
    }

    #[test]
    fn default_config_points_at_local_bridge() {
        let backend = HttpBackend::local_bridge();
        assert_eq!(backend.config().url, LOCAL_BRIDGE_URL);
        assert!(backend.config().require_audio);
        assert_eq!(backend.name(), "piper local");
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = HttpBackendConfigBuilder::default()
            .url("https://tts.example.com/tts")
            .name("piper remote")
            .require_audio(false)
            .build()
            .unwrap();
        assert_eq!(config.url, "https://tts.example.com/tts");
        assert!(!config.require_audio);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    /// Serve one canned HTTP response on a loopback port and hand back the
    /// request line it received.
    fn serve_once(
        status: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let url = format!("http://{}/tts", listener.local_addr().unwrap());
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read request line");
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).expect("read header");
                if n == 0 || header == "\r\n" {
                    break;
                }
            }
            stream.write_all(head.as_bytes()).expect("write head");
            stream.write_all(&body).expect("write body");
            request_line
        });
        (url, handle)
    }

    fn backend_for(url: String) -> HttpBackend {
        HttpBackend::new(
            HttpBackendConfigBuilder::default()
                .url(url)
                .name("piper remote")
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn server_error_status_fails_the_backend() {
        let (url, server) =
            serve_once("500 Internal Server Error", "application/json", b"{}".to_vec());
        let err = backend_for(url).synthesize("你好").unwrap_err();
        server.join().unwrap();
        match err {
            SpeechError::BackendFailed { backend, message } => {
                assert_eq!(backend, "piper remote");
                assert_eq!(message, "HTTP status 500");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_audio_body_is_rejected_when_audio_is_required() {
        let (url, server) = serve_once("200 OK", "text/html", b"<html></html>".to_vec());
        let err = backend_for(url).synthesize("你好").unwrap_err();
        server.join().unwrap();
        match err {
            SpeechError::BackendFailed { message, .. } => {
                assert!(message.contains("text/html"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wav_body_decodes_into_audio() {
        let audio = SynthesisResult {
            samples: vec![0, 512, -512, 1024],
            sample_rate: 22050,
        };
        let (url, server) = serve_once("200 OK", "audio/wav", audio.to_wav_bytes().unwrap());
        let decoded = backend_for(url).synthesize(" 你好 ").expect("wav response should decode");
        let request_line = server.join().unwrap();

        assert_eq!(decoded, audio);
        assert!(request_line.starts_with("GET /tts?"), "{request_line}");
        assert!(
            request_line.contains("text=%E4%BD%A0%E5%A5%BD"),
            "{request_line}"
        );
    }

    #[test]
    fn blank_text_never_hits_the_network() {
        let backend = HttpBackend::new(
            HttpBackendConfigBuilder::default()
                .url("http://127.0.0.1:9/unreachable")
                .build()
                .unwrap(),
        );
        assert!(matches!(backend.synthesize("  "), Err(SpeechError::EmptyText)));
    }
}
