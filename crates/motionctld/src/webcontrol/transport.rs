use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use super::error::WebControlError;

/// Status and body of a webcontrol response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Builds a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues HTTP `GET` requests on behalf of [`super::WebControlClient`].
pub trait HttpTransport: Send + Sync {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when no response could be read.
    fn get(&self, url: &Url) -> Result<HttpResponse, WebControlError>;
}

/// Blocking `reqwest` transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WebControlError::Client`] when the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, WebControlError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            // Webcontrol is always on loopback.
            .no_proxy()
            .build()
            .map_err(|source| WebControlError::Client { source })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, WebControlError> {
        let request_error = |source| WebControlError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.as_str()).send().map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(request_error)?;
        Ok(HttpResponse { status, body })
    }
}
