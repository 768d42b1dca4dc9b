// src/client.rs
// Structured HTTP client: well-formed requests, captured responses

use std::time::Duration;

use reqwest::{Client, Method};

use crate::error::HarnessError;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// HTTP client for well-formed requests against the server under test.
///
/// Targets starting with a scheme are used as-is; anything else is joined to
/// the configured base URL. The caller-supplied path is never escaped or
/// rewritten here — byte-exact request lines go through the raw transport
/// instead.
pub struct StructuredClient {
    client: Client,
    base_url: String,
}

impl StructuredClient {
    pub fn new(base_url: &str) -> Result<Self, HarnessError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(RESPONSE_TIMEOUT)
            .build()
            .map_err(|e| HarnessError::Settings(format!("http client: {}", e)))?;

        Ok(StructuredClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a GET request
    pub async fn get(&self, target: &str) -> Result<CapturedResponse, HarnessError> {
        self.exchange(Method::GET, target).await
    }

    /// Issue a request and capture status, headers and body.
    pub async fn exchange(
        &self,
        method: Method,
        target: &str,
    ) -> Result<CapturedResponse, HarnessError> {
        let url = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}{}", self.base_url, target)
        };

        let response = self
            .client
            .request(method, &url)
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;

        let status = response.status().as_u16();

        let mut headers = CapturedHeaders::default();
        for (name, value) in response.headers() {
            headers.push(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(&url, e))?;

        Ok(CapturedResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_transport_error(url: &str, err: reqwest::Error) -> HarnessError {
    if err.is_timeout() {
        HarnessError::ResponseTimeout(format!("{}: {}", url, err))
    } else {
        HarnessError::ConnectFailure(format!("{}: {}", url, err))
    }
}

/// A fully captured response: status code, ordered multi-valued headers, and
/// the body as text.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: CapturedHeaders,
    pub body: String,
}

impl CapturedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the named header, or `None` when the header is absent.
    pub fn header_first(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers.all(name)
    }

    pub fn content_type(&self) -> Option<mime::Mime> {
        self.header_first("content-type")?.parse().ok()
    }

    pub fn json_body(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Response headers in arrival order, one entry per name with every value.
#[derive(Debug, Clone, Default)]
pub struct CapturedHeaders {
    entries: Vec<(String, Vec<String>)>,
}

impl CapturedHeaders {
    pub fn push(&mut self, name: &str, value: String) {
        let name_lower = name.to_ascii_lowercase();
        if let Some((_, values)) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| *existing == name_lower)
        {
            values.push(value);
        } else {
            self.entries.push((name_lower, vec![value]));
        }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(existing, _)| *existing == name_lower)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        let name_lower = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(existing, _)| *existing == name_lower)
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
