//! Core types and utilities for the SGP.22 Remote SIM Provisioning engine
//!
//! This crate provides the error taxonomy, configuration and small shared
//! identifier types used throughout the LPA implementation.

pub mod config;
pub mod error;
pub mod identifiers;

pub use config::{DeviceConfig, RspConfig};
pub use error::{RspError, RspResult};
pub use identifiers::{Eid, SequenceNumber, TransactionId};
