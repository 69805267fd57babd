//! Error types re-exported from `rsp-core`

pub use rsp_core::error::{RspError, RspResult};
