//! Client builder
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use rsp_client::ClientBuilder;
//!
//! let client = ClientBuilder::new()
//!     .channel(pcsc_reader)
//!     .transport(https_client)
//!     .max_segment_size(255)
//!     .imei("356938035643809")
//!     .build()?;
//! ```

use super::RspClient;
use crate::error::{RspError, RspResult};
use rsp_core::{DeviceConfig, RspConfig};
use rsp_transport::{ApduChannel, HttpTransport};

/// Builder assembling channel, transport and configuration
///
/// Unset options keep the `RspConfig` defaults. The channel and the
/// transport are mandatory.
#[derive(Debug, Clone)]
pub struct ClientBuilder<C, H> {
    channel: Option<C>,
    transport: Option<H>,
    config: RspConfig,
}

impl<C: ApduChannel, H: HttpTransport> ClientBuilder<C, H> {
    pub fn new() -> Self {
        Self {
            channel: None,
            transport: None,
            config: RspConfig::default(),
        }
    }

    /// APDU channel to the eUICC
    pub fn channel(mut self, channel: C) -> Self {
        self.channel = Some(channel);
        self
    }

    /// HTTP transport to SM-DP+ and SM-DS servers
    pub fn transport(mut self, transport: H) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RspConfig) -> Self {
        self.config = config;
        self
    }

    /// ISD-R AID as hex
    pub fn isd_r_aid(mut self, aid: &str) -> Self {
        self.config.isd_r_aid = aid.to_string();
        self
    }

    /// Maximum STORE DATA block payload, 1..=255
    pub fn max_segment_size(mut self, size: usize) -> Self {
        self.config.max_segment_size = size;
        self
    }

    pub fn default_smds_address(mut self, address: &str) -> Self {
        self.config.default_smds_address = address.to_string();
        self
    }

    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.config.device = device;
        self
    }

    /// IMEI reported in DeviceInfo
    pub fn imei(mut self, imei: &str) -> Self {
        self.config.device.imei = Some(imei.to_string());
        self
    }

    /// Wait for a running operation instead of failing with `Busy`
    pub fn wait_when_busy(mut self, wait: bool) -> Self {
        self.config.wait_when_busy = wait;
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// `RspError::Config` if the channel or transport is missing or the
    /// configuration does not validate.
    pub fn build(self) -> RspResult<RspClient<C, H>> {
        let channel = self
            .channel
            .ok_or_else(|| RspError::Config("APDU channel must be configured".to_string()))?;
        let transport = self
            .transport
            .ok_or_else(|| RspError::Config("HTTP transport must be configured".to_string()))?;
        RspClient::new(channel, transport, self.config)
    }
}

impl<C: ApduChannel, H: HttpTransport> Default for ClientBuilder<C, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEuicc, FakeServers};
    use std::sync::Arc;

    type Builder = ClientBuilder<Arc<FakeEuicc>, Arc<FakeServers>>;

    #[test]
    fn test_build_requires_channel_and_transport() {
        assert!(matches!(Builder::new().build(), Err(RspError::Config(_))));
        assert!(matches!(
            Builder::new().channel(Arc::new(FakeEuicc::new())).build(),
            Err(RspError::Config(_))
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let client = Builder::new()
            .channel(Arc::new(FakeEuicc::new()))
            .transport(Arc::new(FakeServers::new()))
            .max_segment_size(255)
            .default_smds_address("prod.smds.rsp.goog")
            .imei("356938035643809")
            .build()
            .unwrap();

        assert_eq!(client.config().max_segment_size, 255);
        assert_eq!(client.config().default_smds_address, "prod.smds.rsp.goog");
        assert_eq!(client.config().device.imei.as_deref(), Some("356938035643809"));
    }

    #[test]
    fn test_builder_validates() {
        let result = Builder::new()
            .channel(Arc::new(FakeEuicc::new()))
            .transport(Arc::new(FakeServers::new()))
            .isd_r_aid("A0")
            .build();
        assert!(matches!(result, Err(RspError::Config(_))));
    }
}
