//! Security helpers for the SGP.22 RSP engine
//!
//! Signing, verification and key agreement happen on the eUICC and the
//! servers. The LPA only hashes the confirmation code and checks that the
//! server echoed the expected challenge and address before forwarding its
//! signed data to the card.

pub mod auth_flow;
pub mod confirmation;
pub mod error;

pub use auth_flow::{ServerSigned1, verify_server_signed1};
pub use confirmation::hash_confirmation_code;
pub use error::{RspError, RspResult};
