//! Native configuration handling for the motion daemon.
//!
//! The daemon keeps its settings in a flat `key value` text file and reports
//! them over its webcontrol interface as `key = value` lines. This crate owns
//! both representations and the typed view exposed to callers:
//!
//! - [`TypedValue`] maps a raw token onto a boolean, integer, string or the
//!   explicit absent marker.
//! - [`extract_pairs`] pulls key/value pairs out of free text for either
//!   [`Separator`].
//! - [`parse`] reads a configuration file into a [`RawConfigMap`].
//! - [`check`] and [`validate`] enforce the keys the supervisor relies on,
//!   including the rules that keep the daemon's own authentication disabled.
//!
//! # Example
//!
//! ```
//! use motion_conf::{RawConfigMap, Separator, TypedValue, extract_pairs};
//!
//! let raw: RawConfigMap = extract_pairs("# comment\nlog_level 6\n", Separator::Whitespace)
//!     .collect();
//! assert_eq!(raw.typed().get("log_level"), Some(&TypedValue::Integer(6)));
//! ```

mod error;
mod extract;
pub mod keys;
mod parser;
mod validator;
mod value;

pub use error::{LoadError, ParseError, ValidationError};
pub use extract::{Separator, extract_pairs, is_safe_token};
pub use keys::is_settable;
pub use parser::{RawConfigMap, parse, parse_str};
pub use validator::{KeyPolicy, KeyRule, REQUIRED_KEYS, ValidatedConfig, check, load, validate};
pub use value::{NULL_MARKER, TypedConfigMap, TypedValue};
