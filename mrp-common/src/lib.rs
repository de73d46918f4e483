//! # MRP Common Library
//!
//! Shared code for the media resolution pipeline crates:
//! - Error type and result alias
//! - TOML bootstrap configuration (model, resolution, loading, writing)
//! - Logging initialization
//! - Clock abstraction for cache expiry and daily quota rollover

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
