//! # Domain
//!
//! Plain data shared by every Scribe crate: configuration sections, table and path
//! constants, and the type-erased feature slice registry. No I/O lives here.

pub mod config;
pub mod constants;
pub mod registry;
