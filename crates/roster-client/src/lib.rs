#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Authenticated JSON client for resource endpoints.
//!
//! Layout:
//! - `token.rs`: injectable token storage (`TokenStore`)
//! - `gateway.rs`: bearer header attachment and session-expired signal
//! - `client.rs`: verb helpers, error classification, body decoding
//! - `error.rs`: `ApiError` taxonomy

pub mod client;
pub mod error;
pub mod gateway;
pub mod token;

pub use client::{RequestClient, classify_problem};
pub use error::{ApiError, ApiResult};
pub use gateway::{SessionExpired, TokenGateway};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
