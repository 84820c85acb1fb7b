//! Shared configuration and error types for fotos.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use crate::config::{AppConfig, StorageSettings};
pub use error::{AppError, AppResult};
