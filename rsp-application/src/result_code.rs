//! Single-integer ES10 responses
//!
//! Many card functions answer with `<root> { [0] INTEGER }`, zero meaning
//! success and any other value a function-specific error code.

use crate::error::{RspError, RspResult};
use crate::tags::ctx;
use rsp_asn1::primitive::decode_integer;
use rsp_asn1::{Tag, Tlv, TlvUnmarshal};

/// Result code returned under a function's root tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode {
    pub root: Tag,
    pub code: i64,
}

impl ResultCode {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Check the root tag and turn a non-zero code into `RspError::Euicc`
    pub fn check(self, expected: Tag, function: &'static str) -> RspResult<()> {
        if self.root != expected {
            return Err(RspError::UnexpectedTag {
                context: function,
                tag: self.root.to_string(),
            });
        }
        if self.is_ok() {
            Ok(())
        } else {
            Err(RspError::Euicc {
                function,
                code: self.code,
            })
        }
    }
}

impl TlvUnmarshal for ResultCode {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        let code = decode_integer(&tlv.require(ctx(0), "result")?.value())?;
        Ok(Self {
            root: tlv.tag(),
            code,
        })
    }
}
