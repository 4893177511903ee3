//! Client for the daemon's embedded webcontrol interface.
//!
//! The daemon answers plain-text `key = value` lines when
//! `webcontrol_html_output` is off. Responses are parsed with
//! [`motion_conf::extract_pairs`] and mapped through
//! [`motion_conf::TypedValue`], so live values and values read from the
//! configuration file share one typed representation.

mod client;
mod error;
mod transport;

pub use client::{ALL_CAMERAS, WebControlClient};
pub use error::WebControlError;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

pub(crate) const WEBCONTROL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::webcontrol");
