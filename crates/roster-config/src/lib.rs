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

//! Typed configuration for the Roster controller and its HTTP client.
//!
//! Layout: `defaults.rs` (baseline values), `model.rs` (config structs),
//! `validate.rs` (parsing/validation helpers), `loader.rs` (environment
//! loading), `error.rs` (error taxonomy).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_from_env, load_with};
pub use model::{ClientConfig, ControllerConfig, RosterConfig};
