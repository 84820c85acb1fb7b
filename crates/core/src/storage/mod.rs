//! Image storage backed by Apache OpenDAL.
//!
//! The [`ImageStorageService`] trait is the capability interface callers
//! depend on. [`ImageStorageAdapter`] implements it on top of an
//! [`ObjectClient`], which covers the handful of provider primitives the
//! adapter needs:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   ImageStorageService                            │
//! │  upload / generate_read_url / generate_upload_url               │
//! │  download / delete / exists / provider_name                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      ObjectClient                                │
//! │ put(key, data, type)       │ presign_read(key, ttl)             │
//! │ get(key)                   │ presign_write(key, type, ttl)      │
//! │ delete(key) / exists(key)  │ bucket_exists()                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │          OpenDAL Operator (GCS, local fs, memory)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uploads are written under `{base_path}/{relative_path}`; every other
//! operation takes the full stored path returned by the upload.

mod client;
mod config;
mod error;
mod service;

pub use client::{ObjectClient, OpendalClient};
pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{ImageStorageAdapter, ImageStorageService};
