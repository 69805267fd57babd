//! Session layer for the SGP.22 RSP engine
//!
//! - [`ApduSession`] talks to the ISD-R over an injected [`ApduChannel`]:
//!   logical channel management, STORE DATA segmentation and response
//!   chaining, plus one method per ES10 function.
//! - [`RemoteSession`] talks to SM-DP+ (ES9+) and SM-DS (ES11) servers over
//!   an injected [`HttpTransport`] using the JSON envelope with base64 TLV
//!   fields.
//!
//! [`ApduChannel`]: rsp_transport::ApduChannel
//! [`HttpTransport`]: rsp_transport::HttpTransport

pub mod apdu;
pub mod error;
pub mod es10;
pub mod es9p;
pub mod remote;

pub use apdu::ApduSession;
pub use error::{RspError, RspResult};
pub use es9p::{AuthenticateClientOk, InitiateAuthenticationOk};
pub use remote::RemoteSession;
