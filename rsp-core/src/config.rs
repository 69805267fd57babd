//! Engine configuration
//!
//! All values have working defaults; callers override individual fields or
//! deserialize the whole structure from their own configuration source.

use crate::error::{RspError, RspResult};
use serde::{Deserialize, Serialize};

/// Application identifier of the ISD-R security domain
pub const DEFAULT_ISD_R_AID: &str = "A0000005591010FFFFFFFF8900000100";

/// Default STORE DATA block payload size
pub const DEFAULT_MAX_SEGMENT_SIZE: usize = 120;

/// GSMA root SM-DS
pub const DEFAULT_SMDS_ADDRESS: &str = "lpa.ds.gsma.com";

/// Type allocation code sent in DeviceInfo when none is configured
pub const DEFAULT_TAC: &str = "35290611";

/// Device description reported to the SM-DP+ during authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Type allocation code, 8 hex digits
    pub tac: String,
    /// Optional IMEI as decimal digits
    pub imei: Option<String>,
    /// Supported GSM release as `major.minor.patch`
    pub gsm_supported_release: Option<String>,
    /// Supported UTRAN release
    pub utran_supported_release: Option<String>,
    /// Supported E-UTRAN/EPC release
    pub eutran_supported_release: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            tac: DEFAULT_TAC.to_string(),
            imei: None,
            gsm_supported_release: Some("8.0.0".to_string()),
            utran_supported_release: Some("8.0.0".to_string()),
            eutran_supported_release: Some("8.0.0".to_string()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RspConfig {
    /// ISD-R application identifier as hex
    pub isd_r_aid: String,
    /// Maximum payload bytes per STORE DATA command
    pub max_segment_size: usize,
    /// SM-DS queried when discovery is called without an address
    pub default_smds_address: String,
    /// Device information for authentication
    pub device: DeviceConfig,
    /// Wait for the client guard instead of failing with `Busy`
    pub wait_when_busy: bool,
}

impl Default for RspConfig {
    fn default() -> Self {
        Self {
            isd_r_aid: DEFAULT_ISD_R_AID.to_string(),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            default_smds_address: DEFAULT_SMDS_ADDRESS.to_string(),
            device: DeviceConfig::default(),
            wait_when_busy: false,
        }
    }
}

impl RspConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `RspError::Config` for an unparsable AID or TAC, or a segment
    /// size outside 1..=255.
    pub fn validate(&self) -> RspResult<()> {
        let aid = self.isd_r_aid_bytes()?;
        if !(5..=16).contains(&aid.len()) {
            return Err(RspError::Config(format!(
                "ISD-R AID must be 5..16 bytes, got {}",
                aid.len()
            )));
        }
        if self.max_segment_size == 0 || self.max_segment_size > 255 {
            return Err(RspError::Config(format!(
                "max_segment_size must be 1..=255, got {}",
                self.max_segment_size
            )));
        }
        let tac = hex::decode(&self.device.tac)
            .map_err(|e| RspError::Config(format!("Invalid TAC '{}': {}", self.device.tac, e)))?;
        if tac.len() != 4 {
            return Err(RspError::Config(format!("TAC must be 4 bytes, got {}", tac.len())));
        }
        if let Some(imei) = &self.device.imei {
            if imei.is_empty() || imei.len() > 16 || !imei.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RspError::Config(format!("Invalid IMEI '{}'", imei)));
            }
        }
        Ok(())
    }

    /// Decoded ISD-R AID
    pub fn isd_r_aid_bytes(&self) -> RspResult<Vec<u8>> {
        hex::decode(&self.isd_r_aid)
            .map_err(|e| RspError::Config(format!("Invalid ISD-R AID '{}': {}", self.isd_r_aid, e)))
    }
}
