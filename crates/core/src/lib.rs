//! Core image storage logic for fotos.
//!
//! # Modules
//!
//! - `storage` - Image storage adapter over a managed object store

pub mod storage;
