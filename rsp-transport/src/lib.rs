//! Transport layer module for the SGP.22 RSP engine
//!
//! This crate defines the two capabilities the engine consumes: an APDU
//! channel to the eUICC and an HTTP transport to SM-DP+/SM-DS servers.
//! Drivers (PC/SC, QMI, MBIM, AT, an HTTP client) implement these traits and
//! are handed to the client at construction time.

pub mod apdu;
pub mod error;
pub mod http;

pub use apdu::{ApduChannel, ApduCommand, ApduResponse, StatusWord};
pub use error::{RspError, RspResult};
pub use http::{HttpResponse, HttpTransport, ADMIN_PROTOCOL, CONTENT_TYPE_JSON};
