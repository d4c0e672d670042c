#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every Scribe crate.
//!
//! * [`scribe_error`] turns an enum into a context-aware `thiserror` error.
//! * [`api_model`] / [`api_handler`] keep request/response DTOs and Axum handlers
//!   consistent and wired into the `OpenAPI` document.
//! * [`scribe_slice`] builds the `Arc` handle of a feature slice.
//! * [`main`] bootstraps the Tokio runtime with a named profile.
//!
//! The examples are `ignore`d because they need the consuming crates in scope.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro to bootstrap the Tokio runtime with a profile from `scribe-runtime`.
///
/// # Arguments
///
/// * `server` - Multi-threaded profile for the HTTP service (large blocking pool for inference).
/// * `compact` - Small footprint for tools and tests.
/// * `default` - Worker threads auto-detected, default stack.
///
/// # Examples
///
/// ```rust,ignore
/// #[scribe_runtime::main(server)]
/// async fn main() -> anyhow::Result<()> {
/// # Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Defines a request/response DTO.
///
/// Adds `Debug`, `Serialize`, `Deserialize` and `utoipa::ToSchema` when they are missing,
/// and applies `#[serde(rename_all = "snake_case")]` so the wire format matches the
/// browser client.
///
/// # Arguments
///
/// * `rename_all = "..."` - Overrides the Serde rename policy.
/// * `deny_unknown_fields = true` - Rejects payloads with extra keys (off by default).
///
/// # Example
///
/// ```rust,ignore
/// #[api_model]
/// pub struct ReportRequest {
///     pub file: Option<String>,
///     pub label: Option<String>,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Marks an async Axum handler as an `OpenAPI` path.
///
/// Accepts the usual `utoipa::path` arguments (`get`, `post`, `path = "..."`,
/// `request_body = ...`, `responses(...)`, `tag = ...`). The handler also gets a
/// `tracing` span named after the function.
///
/// # Example
///
/// ```rust,ignore
/// #[api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, body = HealthResponse)),
///     tag = SYSTEM_TAG
/// )]
/// pub async fn health_handler() -> impl IntoResponse { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Turns an enum into a Scribe error type.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `<Name>Ext` trait adding `.context(..)` to `Result<T, Name>` and to
///   `Result<T, Source>` for every variant carrying a source.
/// * `From<Source>` for every variant with a `source` (or `#[source]`/`#[from]`) field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * `Name::kind()` returning the variant name, used as a structured log field.
///
/// # Requirements
///
/// Variants use named fields. A variant with a source must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// #[scribe_error]
/// pub enum StorageError {
///     #[error("Hardware I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal storage error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StorageError> {
///     std::fs::read("a.png").context("Loading drawing")
/// }
/// ```
#[proc_macro_attribute]
pub fn scribe_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Defines the shared handle of a feature slice.
///
/// The annotated struct becomes `<Name>Inner`; `<Name>` wraps it in an `Arc`,
/// derefs to it and implements `FeatureSlice` so it can be registered in `ApiState`.
///
/// # Example
/// ```rust,ignore
/// #[scribe_derive::scribe_slice]
/// pub struct Gallery {
///     pub media_url: String,
/// }
///
/// let slice = Gallery::new(GalleryInner { media_url: "/media/".to_owned() });
/// ```
#[proc_macro_attribute]
pub fn scribe_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
