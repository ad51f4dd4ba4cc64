//! Session token management.

use anyhow::Context;
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::{AppContext, CliError, CliResult};

pub(crate) fn handle_login(ctx: &AppContext, args: &LoginArgs) -> CliResult<()> {
    let token = args.token.trim();
    if token.is_empty() {
        return Err(CliError::validation("token must not be empty"));
    }
    let store = ctx.token_store();
    store
        .save(token)
        .with_context(|| format!("failed to write {}", store.path().display()))
        .map_err(CliError::failure)?;
    info!(path = %store.path().display(), "session stored");
    eprintln!("session saved to {}", store.path().display());
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let store = ctx.token_store();
    store
        .clear()
        .with_context(|| format!("failed to update {}", store.path().display()))
        .map_err(CliError::failure)?;
    info!(path = %store.path().display(), "session cleared");
    eprintln!("signed out");
    Ok(())
}
