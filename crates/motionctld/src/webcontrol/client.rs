use std::fmt;
use std::sync::Arc;

use motion_conf::{Separator, TypedConfigMap, TypedValue, extract_pairs, is_safe_token};
use tracing::debug;
use url::Url;

use super::WEBCONTROL_TARGET;
use super::error::WebControlError;
use super::transport::HttpTransport;

/// Webcontrol thread addressing every camera at once.
pub const ALL_CAMERAS: u32 = 0;

/// Typed client for the daemon's plain-text webcontrol endpoints.
#[derive(Clone)]
pub struct WebControlClient {
    transport: Arc<dyn HttpTransport>,
    base: Url,
}

impl fmt::Debug for WebControlClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WebControlClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl WebControlClient {
    /// Creates a client rooted at `base`, which should end with a slash.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, base: Url) -> Self {
        Self { transport, base }
    }

    /// Creates a client for the loopback webcontrol `port`, addressing
    /// [`ALL_CAMERAS`].
    ///
    /// # Errors
    ///
    /// Returns [`WebControlError::Address`] if the URL cannot be formed.
    pub fn for_port(transport: Arc<dyn HttpTransport>, port: u16) -> Result<Self, WebControlError> {
        let base = Url::parse(&format!("http://127.0.0.1:{port}/{ALL_CAMERAS}/"))
            .map_err(|source| WebControlError::Address { source })?;
        Ok(Self::new(transport, base))
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Lists every configuration key the daemon reports.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    pub fn list(&self) -> Result<TypedConfigMap, WebControlError> {
        let body = self.fetch("config/list", None)?;
        Ok(extract_pairs(&body, Separator::Equals)
            .map(|(key, value)| (key, TypedValue::from_raw(&value)))
            .collect())
    }

    /// Reads a single key.
    ///
    /// # Errors
    ///
    /// Returns [`WebControlError::NotFound`] when the response does not
    /// mention `key`.
    pub fn get(&self, key: &str) -> Result<TypedValue, WebControlError> {
        ensure_safe(key)?;
        let body = self.fetch("config/get", Some(("query", key)))?;
        extract_pairs(&body, Separator::Equals)
            .find(|(reported, _)| reported == key)
            .map(|(_, value)| TypedValue::from_raw(&value))
            .ok_or_else(|| WebControlError::NotFound {
                key: key.to_owned(),
            })
    }

    /// Changes a key in the daemon's running configuration.
    ///
    /// Both tokens are checked against the safe character class and `key`
    /// against `is_settable` before any request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`WebControlError::Rejected`] unless the daemon echoes the new
    /// value back.
    pub fn set(
        &self,
        key: &str,
        value: &str,
        is_settable: impl Fn(&str) -> bool,
    ) -> Result<(), WebControlError> {
        ensure_safe(key)?;
        ensure_safe(value)?;
        if !is_settable(key) {
            return Err(WebControlError::NotSettable {
                key: key.to_owned(),
            });
        }
        let body = self.fetch("config/set", Some((key, value)))?;
        let expected = TypedValue::from_raw(value);
        let confirmed = extract_pairs(&body, Separator::Equals)
            .any(|(reported, echoed)| reported == key && TypedValue::from_raw(&echoed) == expected);
        if confirmed {
            Ok(())
        } else {
            Err(WebControlError::Rejected {
                key: key.to_owned(),
                value: value.to_owned(),
            })
        }
    }

    /// Asks the daemon to write its running configuration back to disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    pub fn write(&self) -> Result<(), WebControlError> {
        self.fetch("config/write", None).map(drop)
    }

    fn fetch(&self, path: &str, query: Option<(&str, &str)>) -> Result<String, WebControlError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|source| WebControlError::Address { source })?;
        if let Some((key, value)) = query {
            // Tokens are already restricted to characters that need no escaping.
            url.set_query(Some(&format!("{key}={value}")));
        }
        let response = self.transport.get(&url)?;
        debug!(
            target: WEBCONTROL_TARGET,
            url = %url,
            status = response.status,
            "webcontrol request completed"
        );
        if !response.is_success() {
            return Err(WebControlError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

fn ensure_safe(token: &str) -> Result<(), WebControlError> {
    if is_safe_token(token) {
        Ok(())
    } else {
        Err(WebControlError::InvalidToken {
            token: token.to_owned(),
        })
    }
}
