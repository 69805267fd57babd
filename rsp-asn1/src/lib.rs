//! ASN.1 processing module for SGP.22 payloads
//!
//! This crate provides the generic BER-TLV tree codec and the typed primitive
//! readers/writers that the structure layer is built on. It has no knowledge
//! of RSP structures.

pub mod ber;
pub mod error;
pub mod primitive;

pub use ber::{Length, Tag, TagClass, Tlv, TlvMarshal, TlvUnmarshal};
pub use error::{RspError, RspResult};
