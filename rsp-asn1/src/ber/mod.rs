//! BER (Basic Encoding Rules) TLV codec
//!
//! Every card command and every server payload in SGP.22 is a BER-TLV byte
//! stream. Each value is a Tag-Length-Value triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```
//! - CC = Class (00=Universal, 01=Application, 10=Context, 11=Private)
//! - P = Primitive (0) or Constructed (1)
//! - TTTTT = Tag number (0-30), or 11111 when the number continues in
//!   following base-128 octets (high bit set on all but the last)
//!
//! ## Length Encoding
//!
//! - **Short form**: one byte, 0-127
//! - **Long form**: `0x80 | n` followed by `n` big-endian length octets
//! - The indefinite form (`0x80` alone) is rejected
//!
//! Decoding accepts any definite length form; encoding always emits the
//! shortest form.

pub mod tlv;
pub mod types;

pub use tlv::{Tlv, TlvMarshal, TlvUnmarshal};
pub use types::{Length, Tag, TagClass};
