//! Exclusive access to the eUICC session
//!
//! Every lifecycle operation holds a [`CardGuard`] for its whole duration.
//! The guard owns the lock on the client's `ApduSession` and keeps the
//! logical channel to the ISD-R open; [`CardGuard::release`] closes it.

use rsp_session::ApduSession;
use rsp_transport::ApduChannel;
use std::ops::Deref;
use tokio::sync::MutexGuard;

/// Locked, open session with the ISD-R
pub struct CardGuard<'a, C: ApduChannel> {
    session: MutexGuard<'a, ApduSession<C>>,
}

impl<'a, C: ApduChannel> CardGuard<'a, C> {
    pub(crate) fn new(session: MutexGuard<'a, ApduSession<C>>) -> Self {
        Self { session }
    }

    /// Close the logical channel and give up the lock
    ///
    /// A failing close is logged; the operation result has already been
    /// decided by then.
    pub async fn release(mut self) {
        if let Err(e) = self.session.close().await {
            log::warn!("Failed to close ISD-R session: {}", e);
        }
    }
}

impl<C: ApduChannel> Deref for CardGuard<'_, C> {
    type Target = ApduSession<C>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}
