//! Command handlers.

pub(crate) mod resources;
pub(crate) mod session;
