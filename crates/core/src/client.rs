use crate::config::ClientConfig;
use crate::payload::SubmissionPayload;
use crate::traits::CheckTransport;
use crate::{CheckError, CheckResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

pub struct HttpCheckClient {
    client: Client,
    config: ClientConfig,
}

impl HttpCheckClient {
    pub fn new(config: ClientConfig) -> Result<Self, CheckError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches a generated report and writes it to `destination`, returning the byte count.
    pub async fn download_report(&self, report: &str, destination: &Path) -> Result<u64, CheckError> {
        let url = self.config.resolve_report_url(report)?;
        self.download(url, destination).await
    }

    async fn download(&self, url: Url, destination: &Path) -> Result<u64, CheckError> {
        let mut response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(CheckError::BackendResponse {
                url: url.to_string(),
                status: response.status().to_string(),
            });
        }

        // A failed transfer must not leave a truncated report at `destination`.
        let partial = partial_path(destination);
        let written = match stream_to_file(&mut response, &partial).await {
            Ok(written) => written,
            Err(error) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(error);
            }
        };
        tokio::fs::rename(&partial, destination).await?;

        tracing::info!(url = %url, path = %destination.display(), bytes = written, "report saved");
        Ok(written)
    }
}

async fn stream_to_file(response: &mut reqwest::Response, path: &Path) -> Result<u64, CheckError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[async_trait]
impl CheckTransport for HttpCheckClient {
    async fn check(&self, payload: SubmissionPayload) -> Result<CheckResponse, CheckError> {
        tracing::debug!(
            endpoint = %self.config.endpoint,
            parts = ?payload.field_names(),
            "posting submission"
        );

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .multipart(payload.into_form()?)
            .send()
            .await?;

        // The status is not interpreted: the service reports failures in the body.
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(%status, bytes = body.len(), "check response received");

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubmissionInput;
    use crate::UploadFile;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the raw request and answers with `status` and `body`.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let mut response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        serve_raw(response).await
    }

    /// Like `serve_once`, but writes `response` verbatim before closing.
    async fn serve_raw(response: Vec<u8>) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 4096];

            loop {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
                if request_complete(&request) {
                    break;
                }
            }

            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (address, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|window| window == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        request.len() >= header_end + 4 + content_length
    }

    fn client_for(address: &str, path: &str) -> HttpCheckClient {
        let config = ClientConfig::new(&format!("{address}{path}")).unwrap();
        HttpCheckClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn posts_multipart_parts_and_parses_matches() {
        let body = br#"{"matches":[{"source":"doc1.txt","similarity":87,"text":"hello world example"}],"pdf":"/reports/1.pdf"}"#;
        let (address, server) = serve_once("200 OK", "application/json", body.to_vec()).await;
        let client = client_for(&address, "/api/check");

        let input = SubmissionInput {
            text: Some("hello world".to_string()),
            file: Some(UploadFile::new("essay.txt", b"file body".to_vec())),
        };
        let response = client
            .check(SubmissionPayload::from_input(&input))
            .await
            .expect("check should succeed");

        let matches = response.matches().expect("matches should be present");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source, "doc1.txt");
        assert_eq!(response.report_url(), Some("/reports/1.pdf"));

        let request = String::from_utf8_lossy(&server.await.unwrap()).to_string();
        assert!(request.starts_with("POST /api/check HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: multipart/form-data"));
        assert!(request.contains("name=\"text\""));
        assert!(request.contains("hello world"));
        assert!(request.contains("name=\"file\"; filename=\"essay.txt\""));
        assert!(request.contains("file body"));
    }

    #[tokio::test]
    async fn text_only_request_carries_no_file_part() {
        let (address, server) =
            serve_once("200 OK", "application/json", br#"{"matches":[]}"#.to_vec()).await;
        let client = client_for(&address, "/api/check");

        client
            .check(SubmissionPayload::from_input(&SubmissionInput::from_text("only text")))
            .await
            .expect("check should succeed");

        let request = String::from_utf8_lossy(&server.await.unwrap()).to_string();
        assert!(request.contains("name=\"text\""));
        assert!(!request.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn error_status_body_is_still_parsed() {
        let (address, _server) = serve_once(
            "400 Bad Request",
            "application/json",
            br#"{"error":"Unsupported file type"}"#.to_vec(),
        )
        .await;
        let client = client_for(&address, "/api/check");

        let response = client
            .check(SubmissionPayload::default())
            .await
            .expect("body should parse");
        assert_eq!(response.service_error(), Some("Unsupported file type"));
    }

    #[tokio::test]
    async fn non_json_body_is_a_parse_error() {
        let (address, _server) =
            serve_once("502 Bad Gateway", "text/html", b"<html>bad gateway</html>".to_vec()).await;
        let client = client_for(&address, "/api/check");

        let result = client.check(SubmissionPayload::default()).await;
        assert!(matches!(result, Err(CheckError::Serialization(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = client_for(&address, "/api/check");
        let result = client
            .check(SubmissionPayload::from_input(&SubmissionInput::from_text("x")))
            .await;
        assert!(matches!(result, Err(CheckError::Http(_))));
    }

    #[tokio::test]
    async fn download_report_writes_file() -> Result<(), Box<dyn std::error::Error>> {
        let (address, server) =
            serve_once("200 OK", "application/pdf", b"%PDF-1.4 report".to_vec()).await;
        let client = client_for(&address, "/api/check");
        let dir = tempdir()?;
        let destination = dir.path().join("report.pdf");

        let written = client.download_report("/reports/1.pdf", &destination).await?;

        assert_eq!(written, 15);
        assert_eq!(std::fs::read(&destination)?, b"%PDF-1.4 report");
        let request = String::from_utf8_lossy(&server.await?).to_string();
        assert!(request.starts_with("GET /reports/1.pdf HTTP/1.1"));
        Ok(())
    }

    #[tokio::test]
    async fn download_report_rejects_missing_report() -> Result<(), Box<dyn std::error::Error>> {
        let (address, _server) = serve_once(
            "404 Not Found",
            "application/json",
            br#"{"error":"File not found"}"#.to_vec(),
        )
        .await;
        let client = client_for(&address, "/api/check");
        let dir = tempdir()?;

        let result = client
            .download_report("/download-report/missing.pdf", &dir.path().join("out.pdf"))
            .await;
        assert!(matches!(result, Err(CheckError::BackendResponse { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn interrupted_download_leaves_no_file() -> Result<(), Box<dyn std::error::Error>> {
        let (address, _server) = serve_raw(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/pdf\r\ncontent-length: 1000\r\nconnection: close\r\n\r\n%PDF-1.4 cut"
                .to_vec(),
        )
        .await;
        let client = client_for(&address, "/api/check");
        let dir = tempdir()?;
        let destination = dir.path().join("report.pdf");

        let result = client.download_report("/reports/1.pdf", &destination).await;

        assert!(matches!(result, Err(CheckError::Http(_))));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_download_keeps_existing_report() -> Result<(), Box<dyn std::error::Error>> {
        let (address, _server) = serve_raw(
            b"HTTP/1.1 200 OK\r\ncontent-length: 50\r\nconnection: close\r\n\r\npartial".to_vec(),
        )
        .await;
        let client = client_for(&address, "/api/check");
        let dir = tempdir()?;
        let destination = dir.path().join("report.pdf");
        std::fs::write(&destination, b"previous report")?;

        assert!(client.download_report("/reports/1.pdf", &destination).await.is_err());
        assert_eq!(std::fs::read(&destination)?, b"previous report");
        Ok(())
    }

    #[test]
    fn partial_path_is_a_sibling() {
        let path = partial_path(Path::new("/tmp/out/report.pdf"));
        assert_eq!(path, PathBuf::from("/tmp/out/report.pdf.part"));
    }
}
