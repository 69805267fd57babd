//! Rust implementation of the GSMA SGP.22 Local Profile Assistant engine
//!
//! The library manages eSIM profiles on an eUICC: it downloads and installs
//! profiles from an SM-DP+, discovers pending events on an SM-DS and
//! delivers the notifications the eUICC produces.
//!
//! # Architecture
//!
//! - `rsp-core`: error taxonomy, configuration, identifiers
//! - `rsp-asn1`: BER-TLV codec and primitive value codecs
//! - `rsp-transport`: APDU channel and HTTP transport capabilities
//! - `rsp-application`: SGP.22 structures and ES10 PDUs
//! - `rsp-security`: confirmation code hashing, serverSigned1 checks
//! - `rsp-session`: ES10 over STORE DATA, ES9+/ES11 over HTTP
//! - `rsp-client`: download, discovery and notification orchestration
//!
//! The host supplies the two capabilities: an [`ApduChannel`] reaching the
//! eUICC and an [`HttpTransport`] reaching the servers.
//!
//! # Usage
//!
//! ```no_run
//! use rsp::client::ClientBuilder;
//! ```

pub use rsp_application::{ActivationCode, EventEntry, Iccid, NotificationMetadata, ProfileIdentifier, ProfileInfo};
pub use rsp_core::{Eid, RspConfig, RspError, RspResult, SequenceNumber, TransactionId};
pub use rsp_transport::{ApduChannel, HttpResponse, HttpTransport};

// Re-export client API
pub mod client {
    pub use rsp_client::*;
}

// Re-export structures and codecs
pub mod asn1 {
    pub use rsp_asn1::*;
}

pub mod application {
    pub use rsp_application::*;
}

pub mod session {
    pub use rsp_session::*;
}

pub mod security {
    pub use rsp_security::*;
}
