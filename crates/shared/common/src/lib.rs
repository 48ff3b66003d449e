//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - The application error type and its HTTP envelope
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, ErrorDetail, OptionExt};
