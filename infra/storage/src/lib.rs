//! Sandboxed file storage for drawings, guest uploads and the report log.
//!
//! Every path handed to [`Storage`] is relative to a canonicalized root and is checked
//! for traversal before any I/O happens.
//!
//! - **Atomic writes**: unique temp file, `fsync`, then `rename`.
//! - **Append-only files**: [`Storage::append`] adds a line under an async lock.
//! - **Namespaces**: [`Storage::namespace`] scopes a group of files under one directory.
//! - **Sharding**: optional two-level fan-out by filename. Off keeps paths URL-stable.
//! - **Self-healing**: stale temp files from a crashed write are removed on connect.
//!
//! # Examples
//!
//! ```rust
//! use scribe_storage::{Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let storage = Storage::builder().root(tmp.path().join("media")).sharding(false).connect().await?;
//!
//!     storage.write("canvas_20260101_120000_a1b2c3.png", b"png bytes").await?;
//!     assert_eq!(storage.read("canvas_20260101_120000_a1b2c3.png").await?, b"png bytes");
//!
//!     let reports = storage.namespace("reports")?;
//!     reports.append("reports.jsonl", r#"{"label":"HELLO"}"#).await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
pub use namespace::NamespacedStorage;
