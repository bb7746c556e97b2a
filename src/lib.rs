//! # BOOM Monitor
//! Market-cap watcher for the BOOM protocol on Solana.
//!
//! Polls a price feed, computes the implied market capitalization of a single
//! token and submits the trigger_explosion instruction exactly once when the
//! configured USD threshold is crossed.

pub use crate::utils::error::{Error, Result};

pub mod blockchain;
pub mod config;
pub mod feed;
pub mod monitor;
pub mod utils;
