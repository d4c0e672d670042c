//! Kernel shared by every Scribe feature slice: config loading, the Axum state, the
//! JSON error type and request extractors.
//!
//! ## ID generation
//! `safe_nanoid!` produces URL-safe IDs without look-alike characters:
//! ```rust
//! # use scribe_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
pub mod config;
pub mod error;
pub mod extract;
pub mod server;

pub use error::{ApiError, ApiErrorExt, ErrorResponse};
pub use scribe_domain as domain;
pub use nanoid::nanoid;

// No I, O, l, 0 or 1.
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Generates a 12-character `NanoID` from [`SAFE_ALPHABET`], or `$size` characters.
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
