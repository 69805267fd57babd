//! APDU channel capability and command/response framing

use crate::error::{RspError, RspResult};
use async_trait::async_trait;
use std::fmt;

/// Channel to the eUICC
///
/// `transmit` sends one command APDU and returns the raw response APDU
/// (data followed by SW1 SW2). Implementations report transport failures as
/// `RspError::Channel`; status words are interpreted by the caller.
///
/// The handle is shared read-only, so drivers that need mutable state keep
/// it behind their own interior mutability.
#[async_trait]
pub trait ApduChannel: Send + Sync {
    async fn transmit(&self, command: &[u8]) -> RspResult<Vec<u8>>;
}

#[async_trait]
impl<T: ApduChannel + ?Sized> ApduChannel for std::sync::Arc<T> {
    async fn transmit(&self, command: &[u8]) -> RspResult<Vec<u8>> {
        (**self).transmit(command).await
    }
}

/// Status word (SW1 SW2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    pub const SUCCESS: StatusWord = StatusWord(0x9000);

    pub fn sw1(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn sw2(&self) -> u8 {
        self.0 as u8
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0x9000
    }

    /// Remaining response bytes announced by `61xx`
    ///
    /// `6100` announces 256 or more bytes.
    pub fn bytes_remaining(&self) -> Option<usize> {
        if self.sw1() == 0x61 {
            Some(if self.sw2() == 0 { 256 } else { self.sw2() as usize })
        } else {
            None
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// Short command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    /// Expected response length; `Some(0)` asks for up to 256 bytes
    pub le: Option<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Serialize to the short APDU wire format
    ///
    /// # Errors
    /// `RspError::Channel` if the payload exceeds 255 bytes.
    pub fn encode(&self) -> RspResult<Vec<u8>> {
        if self.data.len() > 255 {
            return Err(RspError::Channel(format!(
                "Command data of {} bytes does not fit a short APDU",
                self.data.len()
            )));
        }

        let mut out = Vec::with_capacity(5 + self.data.len() + 1);
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.data.is_empty() {
            out.push(self.data.len() as u8);
            out.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            out.push(le);
        }
        Ok(out)
    }
}

/// Response APDU split into data and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw: StatusWord,
}

impl ApduResponse {
    /// Parse raw response bytes
    ///
    /// # Errors
    /// `RspError::Channel` if fewer than two bytes were returned.
    pub fn parse(mut raw: Vec<u8>) -> RspResult<Self> {
        if raw.len() < 2 {
            return Err(RspError::Channel(format!(
                "Response of {} bytes has no status word",
                raw.len()
            )));
        }
        let sw2 = raw.pop().unwrap_or_default();
        let sw1 = raw.pop().unwrap_or_default();
        Ok(Self {
            data: raw,
            sw: StatusWord(((sw1 as u16) << 8) | sw2 as u16),
        })
    }
}
