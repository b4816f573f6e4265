use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use reqwest::StatusCode;

use crate::config::ClientConfig;
use crate::error::ErrorKind;
use crate::media::MediaFile;

pub const EMPTY_TRANSCRIPT: &str = "No text returned.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Success { text: String },
    Failure { kind: ErrorKind },
}

impl TranscriptionOutcome {
    /// Text shown in the transcript area: the transcript itself or the
    /// failure message.
    pub fn display_text(&self) -> String {
        match self {
            TranscriptionOutcome::Success { text } => text.clone(),
            TranscriptionOutcome::Failure { kind } => kind.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success { .. })
    }
}

/// Anything that can turn a media file into an outcome. Never fails:
/// every error is folded into `TranscriptionOutcome::Failure`.
pub trait Transcribe: Send + Sync + 'static {
    fn transcribe(&self, file: &MediaFile) -> impl Future<Output = TranscriptionOutcome> + Send;
}

pub fn classify_response(status: StatusCode, body: &str) -> TranscriptionOutcome {
    if let Some(kind) = ErrorKind::from_status(status) {
        return TranscriptionOutcome::Failure { kind };
    }

    if body.is_empty() {
        TranscriptionOutcome::Success {
            text: EMPTY_TRANSCRIPT.to_string(),
        }
    } else {
        TranscriptionOutcome::Success {
            text: body.to_string(),
        }
    }
}

pub struct TranscriptionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TranscriptionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            endpoint: config.transcribe_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send_transcription_request(&self, file: &MediaFile) -> TranscriptionOutcome {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(file.content.clone()).file_name(file.name.clone()),
        );

        info!(
            "Sending {} ({} bytes) to {}",
            file.name, file.size_bytes, self.endpoint
        );

        let response = match self.http.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to send request: {e}");
                return TranscriptionOutcome::Failure {
                    kind: ErrorKind::ConnectionError,
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to read response ({status}): {e}");
                return TranscriptionOutcome::Failure {
                    kind: ErrorKind::ConnectionError,
                };
            }
        };

        let outcome = classify_response(status, &body);
        match &outcome {
            TranscriptionOutcome::Success { text } => {
                debug!("Transcription returned {status}: {} characters", text.len());
            }
            TranscriptionOutcome::Failure { kind } => {
                warn!("Server returned error {status} ({kind:?}): {body}");
            }
        }
        outcome
    }
}

impl Transcribe for TranscriptionClient {
    fn transcribe(&self, file: &MediaFile) -> impl Future<Output = TranscriptionOutcome> + Send {
        self.send_transcription_request(file)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use actix_multipart::Multipart;
    use actix_web::{App, HttpResponse, HttpServer, Responder, post, web};
    use futures_util::TryStreamExt;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub(crate) struct ReceivedField {
        pub name: String,
        pub bytes: usize,
    }

    struct MockReply {
        status: u16,
        body: String,
        received: Arc<Mutex<Vec<ReceivedField>>>,
    }

    #[post("/transcribe")]
    async fn mock_transcribe(data: web::Data<MockReply>, mut payload: Multipart) -> impl Responder {
        while let Ok(Some(mut field)) = payload.try_next().await {
            let name = field.name().unwrap_or_default().to_string();
            let mut bytes = 0;
            while let Ok(Some(chunk)) = field.try_next().await {
                bytes += chunk.len();
            }
            data.received.lock().unwrap().push(ReceivedField { name, bytes });
        }

        let status = actix_web::http::StatusCode::from_u16(data.status).unwrap();
        HttpResponse::build(status).body(data.body.clone())
    }

    /// Mock transcription service on an ephemeral port. Returns its base
    /// URL and the multipart fields it has seen.
    pub(crate) fn spawn_mock_endpoint(
        status: u16,
        body: &str,
    ) -> (String, Arc<Mutex<Vec<ReceivedField>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let reply = web::Data::new(MockReply {
            status,
            body: body.to_string(),
            received: received.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(reply.clone())
                .service(mock_transcribe)
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        (format!("http://{addr}"), received)
    }

    /// A base URL nothing is listening on.
    pub(crate) fn closed_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    /// Reads one HTTP request (headers plus `Content-Length` body).
    fn drain_request(stream: &mut TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; content_length];
        let _ = reader.read_exact(&mut body);
    }

    /// Raw socket server that handles a single connection with `respond`.
    fn spawn_raw_endpoint<F>(respond: F) -> String
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                respond(stream);
            }
        });
        format!("http://{addr}")
    }

    fn client_with_timeout(base_url: String, timeout: Duration) -> TranscriptionClient {
        let config = ClientConfig {
            base_url,
            timeout: Some(timeout),
        };
        TranscriptionClient::new(&config).unwrap()
    }

    fn client_for(base_url: String) -> TranscriptionClient {
        client_with_timeout(base_url, Duration::from_secs(10))
    }

    fn speech() -> MediaFile {
        MediaFile::new("speech.mp3", vec![7u8; 4096])
    }

    #[test]
    fn empty_success_body_gets_placeholder() {
        assert_eq!(
            classify_response(StatusCode::OK, ""),
            TranscriptionOutcome::Success {
                text: EMPTY_TRANSCRIPT.to_string()
            }
        );
    }

    #[test]
    fn whitespace_body_is_kept_verbatim() {
        assert_eq!(
            classify_response(StatusCode::OK, " \n"),
            TranscriptionOutcome::Success {
                text: " \n".to_string()
            }
        );
    }

    #[test]
    fn error_status_ignores_body() {
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            TranscriptionOutcome::Failure {
                kind: ErrorKind::RateLimited
            }
        );
        assert_eq!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            TranscriptionOutcome::Failure {
                kind: ErrorKind::ServerError
            }
        );
    }

    #[test]
    fn failure_displays_its_message() {
        let outcome = TranscriptionOutcome::Failure {
            kind: ErrorKind::ConnectionError,
        };
        assert_eq!(
            outcome.display_text(),
            ErrorKind::ConnectionError.to_string()
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn endpoint_joins_transcribe_path() {
        let client = client_for("http://example.test/".to_string());
        assert_eq!(client.endpoint(), "http://example.test/transcribe");
    }

    #[actix_web::test]
    async fn uploads_single_file_field_and_returns_body() {
        let (base_url, received) = spawn_mock_endpoint(200, "hello world");
        let client = client_for(base_url);

        let outcome = client.transcribe(&speech()).await;

        assert_eq!(
            outcome,
            TranscriptionOutcome::Success {
                text: "hello world".to_string()
            }
        );
        let fields = received.lock().unwrap().clone();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "file");
        assert_eq!(fields[0].bytes, 4096);
    }

    #[actix_web::test]
    async fn empty_body_from_server() {
        let (base_url, _) = spawn_mock_endpoint(200, "");
        let outcome = client_for(base_url).transcribe(&speech()).await;
        assert_eq!(outcome.display_text(), "No text returned.");
    }

    #[actix_web::test]
    async fn classified_statuses_from_server() {
        let cases = [
            (413, ErrorKind::PayloadTooLarge),
            (415, ErrorKind::UnsupportedMediaType),
            (429, ErrorKind::RateLimited),
            (500, ErrorKind::ServerError),
            (404, ErrorKind::ServerError),
        ];
        for (status, kind) in cases {
            let (base_url, _) = spawn_mock_endpoint(status, "error detail");
            let outcome = client_for(base_url).transcribe(&speech()).await;
            assert_eq!(outcome, TranscriptionOutcome::Failure { kind }, "status {status}");
        }
    }

    #[actix_web::test]
    async fn unreachable_server_is_connection_error() {
        let outcome = client_for(closed_endpoint()).transcribe(&speech()).await;
        assert_eq!(
            outcome,
            TranscriptionOutcome::Failure {
                kind: ErrorKind::ConnectionError
            }
        );
    }

    #[tokio::test]
    async fn elapsed_timeout_is_connection_error() {
        let base_url = spawn_raw_endpoint(|mut stream| {
            drain_request(&mut stream);
            std::thread::sleep(Duration::from_secs(3));
        });
        let client = client_with_timeout(base_url, Duration::from_millis(500));

        let outcome = client.transcribe(&speech()).await;

        assert_eq!(
            outcome,
            TranscriptionOutcome::Failure {
                kind: ErrorKind::ConnectionError
            }
        );
    }

    #[tokio::test]
    async fn truncated_body_is_connection_error() {
        let base_url = spawn_raw_endpoint(|mut stream| {
            drain_request(&mut stream);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello");
            let _ = stream.flush();
        });

        let outcome = client_for(base_url).transcribe(&speech()).await;

        assert_eq!(
            outcome,
            TranscriptionOutcome::Failure {
                kind: ErrorKind::ConnectionError
            }
        );
    }
}
