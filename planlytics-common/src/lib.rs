//! # PlanLytics Common Library
//!
//! Shared code for the PlanLytics client and gateway:
//! - Upload/analyze/chat wire types
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod api;
pub mod config;
pub mod error;

pub use api::types::RowCount;
pub use error::{Error, Result};
