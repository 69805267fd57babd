//! LPA client
//!
//! [`RspClient`] ties one eUICC (through its APDU channel) to the HTTP
//! transport used for SM-DP+ and SM-DS servers. The lifecycle operations are
//! implemented in the sibling modules of this crate:
//!
//! - `download`: profile download and installation
//! - `discovery`: SM-DS event discovery, discover-and-install
//! - `notifications`: listing, delivery and removal of notifications
//! - `chip_info` and `profiles`: chip information and profile management
//!
//! # Concurrency
//!
//! One operation runs at a time per client. A second concurrent call fails
//! with `RspError::Busy`, or waits when `RspConfig::wait_when_busy` is set.
//! Independent clients for different eUICCs may run in parallel.

use super::guard::CardGuard;
use crate::error::{RspError, RspResult};
use rsp_core::RspConfig;
use rsp_session::{ApduSession, RemoteSession};
use rsp_transport::{ApduChannel, HttpTransport};
use tokio::sync::Mutex;

/// LPA engine for one eUICC
pub struct RspClient<C: ApduChannel, H: HttpTransport> {
    card: Mutex<ApduSession<C>>,
    remote: RemoteSession<H>,
    config: RspConfig,
}

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// Create a client from its capabilities
    ///
    /// # Errors
    /// `RspError::Config` if the configuration does not validate.
    pub fn new(channel: C, transport: H, config: RspConfig) -> RspResult<Self> {
        let card = ApduSession::new(channel, &config)?;
        Ok(Self {
            card: Mutex::new(card),
            remote: RemoteSession::new(transport),
            config,
        })
    }

    pub fn config(&self) -> &RspConfig {
        &self.config
    }

    pub(crate) fn remote(&self) -> &RemoteSession<H> {
        &self.remote
    }

    /// Take the client guard and open the ISD-R session
    ///
    /// # Errors
    /// `RspError::Busy` when another operation holds the guard and the
    /// client is configured to fail fast; card errors from opening the
    /// logical channel.
    pub async fn acquire(&self) -> RspResult<CardGuard<'_, C>> {
        let mut session = if self.config.wait_when_busy {
            self.card.lock().await
        } else {
            self.card.try_lock().map_err(|_| RspError::Busy)?
        };
        session.open().await?;
        Ok(CardGuard::new(session))
    }
}
