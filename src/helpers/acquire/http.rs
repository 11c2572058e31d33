//! HTTP transport
//!
//! Blocking `ureq` client. Redirect, proxy and retry behaviour are whatever
//! the agent does by default; the pipeline does not add its own.

use std::io::Read;
use std::time::Duration;

use super::{DownloadRequest, Downloaded, Transport, TransportError, download};

/// Default connect and idle-read timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Upper bound for side documents (log lists, SCT bundles)
const MAX_FETCH_BYTES: u64 = 16 * 1024 * 1024;

const USER_AGENT: &str = concat!("btget/", env!("CARGO_PKG_VERSION"));

/// [`Transport`] backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// `timeout` bounds connecting and each read. A body that keeps
    /// arriving may take as long as it needs.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, TransportError> {
        self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => TransportError::Status {
                url: url.to_string(),
                status,
            },
            other => TransportError::Request {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

impl Transport for HttpTransport {
    fn download(&self, request: &DownloadRequest<'_>) -> Result<Downloaded, TransportError> {
        let response = self.get(request.url)?;

        let content_length = response
            .header("content-length")
            .and_then(|s| s.parse().ok());
        let headers = collect_headers(&response);

        download::write_artifact(response.into_reader(), content_length, headers, request)
    }

    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let response = match self.get(url) {
            Ok(r) => r,
            Err(TransportError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_FETCH_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                reason: format!("failed to read response: {}", e),
            })?;

        if body.len() as u64 > MAX_FETCH_BYTES {
            return Err(TransportError::TooLarge {
                url: url.to_string(),
                limit: MAX_FETCH_BYTES,
            });
        }
        Ok(Some(body))
    }
}

fn collect_headers(response: &ureq::Response) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for name in response.headers_names() {
        for value in response.all(&name) {
            headers.push((name.to_ascii_lowercase(), value.to_string()));
        }
    }
    headers
}
