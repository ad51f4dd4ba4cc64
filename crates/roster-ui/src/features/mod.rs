//! Feature surfaces built on the core controller blocks.

pub mod resources;
