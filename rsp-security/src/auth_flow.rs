//! Server authentication checks performed by the LPA
//!
//! During `initiateAuthentication` the server returns `serverSigned1`:
//!
//! ```text
//! ServerSigned1 ::= SEQUENCE {
//!     transactionId [0] TransactionId,
//!     euiccChallenge [1] Octet16,
//!     serverAddress [3] UTF8String,
//!     serverChallenge [4] Octet16
//! }
//! ```
//!
//! The eUICC verifies the signature. Before handing it over, the LPA makes
//! sure the server answered the challenge it was given and identifies
//! itself with the address the LPA contacted. A mismatch aborts the session.

use crate::error::{RspError, RspResult};
use rsp_asn1::{Tag, Tlv, TlvUnmarshal};
use rsp_core::TransactionId;

/// Decoded `serverSigned1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSigned1 {
    pub transaction_id: TransactionId,
    pub euicc_challenge: Vec<u8>,
    pub server_address: String,
    pub server_challenge: Vec<u8>,
}

impl TlvUnmarshal for ServerSigned1 {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(Tag::universal(true, 16), "ServerSigned1")?;

        let field = |number: u32, name: &str| -> RspResult<Vec<u8>> {
            Ok(tlv
                .require(Tag::context_specific(false, number), name)?
                .value()
                .to_vec())
        };

        let server_address = String::from_utf8(field(3, "serverAddress")?)
            .map_err(|e| RspError::MalformedEncoding(format!("Invalid serverAddress: {}", e)))?;

        Ok(Self {
            transaction_id: TransactionId::new(field(0, "transactionId")?),
            euicc_challenge: field(1, "euiccChallenge")?,
            server_address,
            server_challenge: field(4, "serverChallenge")?,
        })
    }
}

/// Check `serverSigned1` against the session it belongs to
///
/// # Arguments
/// * `signed` - Encoded `serverSigned1` as received from the server
/// * `euicc_challenge` - Challenge the eUICC generated for this session
/// * `server_address` - Address the LPA sent the request to
/// * `transaction_id` - Transaction id announced in the JSON envelope
///
/// # Returns
/// The decoded structure when every check passes
///
/// # Errors
/// `RspError::Decode` naming the first mismatching field.
pub fn verify_server_signed1(
    signed: &[u8],
    euicc_challenge: &[u8],
    server_address: &str,
    transaction_id: &TransactionId,
) -> RspResult<ServerSigned1> {
    let decoded = ServerSigned1::from_bytes(signed)?;

    if decoded.euicc_challenge != euicc_challenge {
        return Err(RspError::Decode(
            "serverSigned1 does not echo the eUICC challenge".to_string(),
        ));
    }
    if !decoded.server_address.eq_ignore_ascii_case(server_address) {
        return Err(RspError::Decode(format!(
            "serverSigned1 names {} but {} was contacted",
            decoded.server_address, server_address
        )));
    }
    if &decoded.transaction_id != transaction_id {
        return Err(RspError::Decode(format!(
            "serverSigned1 carries transaction {} instead of {}",
            decoded.transaction_id, transaction_id
        )));
    }

    log::debug!("serverSigned1 accepted for transaction {}", transaction_id);
    Ok(decoded)
}
