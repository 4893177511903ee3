//! Required-key rules for a configuration the supervisor can run.
//!
//! The supervisor is the only access-control layer in front of the daemon,
//! so the rules below reject any configuration that leaves the daemon's own
//! web UI or authentication enabled. Rules are checked in table order and the
//! first violation is reported.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::error::{LoadError, ValidationError};
use crate::keys;
use crate::parser::{RawConfigMap, parse};

/// What a rule demands of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Present with a non-empty value.
    Required,
    /// Present and exactly equal to the given value.
    Equals(&'static str),
    /// Present, non-empty and not equal to the given value.
    RequiredExcept(&'static str),
    /// Missing or blank.
    Absent,
}

impl KeyPolicy {
    fn accepts(self, value: Option<&str>) -> bool {
        let present = value.map(str::trim).filter(|token| !token.is_empty());
        match self {
            Self::Required => present.is_some(),
            Self::Equals(expected) => present == Some(expected),
            Self::RequiredExcept(forbidden) => present.is_some_and(|token| token != forbidden),
            Self::Absent => present.is_none(),
        }
    }
}

/// One entry of the required-key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRule {
    /// Configuration key the rule applies to.
    pub key: &'static str,
    /// Condition the key must satisfy.
    pub policy: KeyPolicy,
    /// Message reported when the condition fails.
    pub reason: &'static str,
}

/// Rules every configuration must satisfy, in evaluation order.
pub const REQUIRED_KEYS: [KeyRule; 8] = [
    KeyRule {
        key: keys::WEBCONTROL_PORT,
        policy: KeyPolicy::Required,
        reason: "missing webcontrol port",
    },
    KeyRule {
        key: keys::STREAM_PORT,
        policy: KeyPolicy::Required,
        reason: "parameter not found",
    },
    KeyRule {
        key: keys::WEBCONTROL_HTML_OUTPUT,
        policy: KeyPolicy::RequiredExcept("on"),
        reason: "parameter not found or set to 'on' (must be 'off')",
    },
    KeyRule {
        key: keys::WEBCONTROL_PARMS,
        policy: KeyPolicy::Equals("2"),
        reason: "webcontrol authentication is enabled, set it to '2' so motionctl handles login",
    },
    KeyRule {
        key: keys::WEBCONTROL_AUTHENTICATION,
        policy: KeyPolicy::Absent,
        reason: "parameter must be commented out",
    },
    KeyRule {
        key: keys::STREAM_AUTH_METHOD,
        policy: KeyPolicy::Equals("0"),
        reason: "stream authentication is enabled, set it to '0' so motionctl handles login",
    },
    KeyRule {
        key: keys::STREAM_AUTHENTICATION,
        policy: KeyPolicy::Absent,
        reason: "parameter must be commented out",
    },
    KeyRule {
        key: keys::PROCESS_ID_FILE,
        policy: KeyPolicy::Required,
        reason: "parameter not found",
    },
];

/// Checks `config` against [`REQUIRED_KEYS`].
///
/// # Errors
///
/// Returns the first violated rule.
pub fn check(config: &RawConfigMap) -> Result<(), ValidationError> {
    REQUIRED_KEYS
        .iter()
        .find(|rule| !rule.policy.accepts(config.get(rule.key)))
        .map_or(Ok(()), |rule| Err(ValidationError::new(rule.key, rule.reason)))
}

/// A configuration that passed [`check`], with the values the supervisor
/// needs already extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    path: PathBuf,
    raw: RawConfigMap,
    webcontrol_port: u16,
    stream_port: u16,
    pid_file: PathBuf,
}

impl ValidatedConfig {
    /// Path the configuration was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw mapping.
    #[must_use]
    pub const fn raw(&self) -> &RawConfigMap {
        &self.raw
    }

    /// Port of the webcontrol interface.
    #[must_use]
    pub const fn webcontrol_port(&self) -> u16 {
        self.webcontrol_port
    }

    /// Loopback address of the webcontrol interface.
    #[must_use]
    pub const fn webcontrol_address(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.webcontrol_port)
    }

    /// Port of the MJPEG stream.
    #[must_use]
    pub const fn stream_port(&self) -> u16 {
        self.stream_port
    }

    /// Loopback address of the MJPEG stream, for proxying it onwards.
    #[must_use]
    pub const fn stream_address(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.stream_port)
    }

    /// File the daemon writes its PID to.
    #[must_use]
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }
}

/// Checks `raw` and extracts the ports and PID file.
///
/// # Errors
///
/// Returns the first violated rule, or a port that is not a valid TCP port.
pub fn validate(
    path: impl Into<PathBuf>,
    raw: RawConfigMap,
) -> Result<ValidatedConfig, ValidationError> {
    check(&raw)?;
    let webcontrol_port = port(&raw, keys::WEBCONTROL_PORT)?;
    let stream_port = port(&raw, keys::STREAM_PORT)?;
    let pid_file = raw
        .get(keys::PROCESS_ID_FILE)
        .map(|value| PathBuf::from(value.trim()))
        .ok_or_else(|| ValidationError::new(keys::PROCESS_ID_FILE, "parameter not found"))?;
    Ok(ValidatedConfig {
        path: path.into(),
        raw,
        webcontrol_port,
        stream_port,
        pid_file,
    })
}

/// Reads and validates the configuration file at `path`.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] when the file cannot be read and
/// [`LoadError::Invalid`] when it violates a rule.
pub fn load(path: &Path) -> Result<ValidatedConfig, LoadError> {
    let raw = parse(path)?;
    validate(path, raw).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn port(raw: &RawConfigMap, key: &'static str) -> Result<u16, ValidationError> {
    raw.get(key)
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .ok_or_else(|| ValidationError::new(key, "must be a TCP port between 1 and 65535"))
}
