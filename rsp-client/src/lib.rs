//! SGP.22 profile lifecycle orchestrator
//!
//! This crate drives the LPA side of Remote SIM Provisioning against one
//! eUICC: profile download and installation, SM-DS discovery, notification
//! delivery, chip information and profile management.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rsp_client::{ClientBuilder, DownloadOptions};
//!
//! let client = ClientBuilder::new().channel(reader).transport(https).build()?;
//! let code = "LPA:1$smdp.example.com$MATCHING-ID".parse()?;
//! let result = client.download_profile(&code, &DownloadOptions::default()).await?;
//! ```

pub mod cancel;
pub mod chip_info;
pub mod client;
pub mod discovery;
pub mod download;
pub mod error;
pub mod notifications;
pub mod profiles;

#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use chip_info::ChipInfo;
pub use client::{CardGuard, ClientBuilder, RspClient};
pub use discovery::DiscoveryOptions;
pub use download::{DownloadFailure, DownloadOptions, DownloadStage};
pub use error::{RspError, RspResult};
pub use notifications::{NotificationOptions, NotificationOutcome};
