//! Application context and error types shared by command handlers.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::anyhow;
use roster_api_models::Record;
use roster_client::{ApiError, FileTokenStore, RequestClient, TokenGateway};
use roster_config::RosterConfig;
use roster_ui::{GateError, ResourceController, RestResource, TokioScheduler};

use crate::cli::{Cli, OutputFormat};

/// CLI-level error type separating bad input, lost sessions, and
/// operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Session(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Map an API failure onto the CLI taxonomy.
    pub(crate) fn from_api(error: ApiError) -> Self {
        if error.is_session_error() {
            return Self::Session(error.user_message());
        }
        match error {
            ApiError::Validation { message, .. } => Self::Validation(message),
            other => {
                let summary = other.user_message();
                Self::Failure(anyhow::Error::new(other).context(summary))
            }
        }
    }

    pub(crate) fn from_gate(error: GateError) -> Self {
        Self::Failure(anyhow!(error))
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Session(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Session(message) => format!("{message} Run `roster login` to start a new session."),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) config: RosterConfig,
    pub(crate) resource: String,
    pub(crate) items_field: String,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Resolve configuration from flags and the process environment.
    pub(crate) fn from_cli(cli: &Cli) -> CliResult<Self> {
        let config = cli.resolve_config(|key| std::env::var(key).ok())?;
        Self::new(config, &cli.resource, cli.items_field.as_deref(), cli.output)
    }

    pub(crate) fn new(
        config: RosterConfig,
        resource: &str,
        items_field: Option<&str>,
        output: OutputFormat,
    ) -> CliResult<Self> {
        let resource = resource.trim().trim_matches('/');
        if resource.is_empty() {
            return Err(CliError::validation("resource path must not be empty"));
        }
        let items_field = items_field
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .or_else(|| resource.rsplit('/').next())
            .unwrap_or(resource)
            .to_string();
        Ok(Self {
            config,
            resource: resource.to_string(),
            items_field,
            output,
        })
    }

    pub(crate) fn token_store(&self) -> FileTokenStore {
        FileTokenStore::new(
            self.config.client.token_file.clone(),
            self.config.client.token_key.clone(),
        )
    }

    /// Build a controller for the configured resource on the current runtime.
    pub(crate) fn controller(&self) -> CliResult<ResourceController<Record>> {
        let gateway = TokenGateway::new(Arc::new(self.token_store()));
        let client =
            RequestClient::from_config(&self.config.client, gateway).map_err(CliError::from_api)?;
        let scheduler = TokioScheduler::try_current()
            .map_err(|err| CliError::failure(anyhow!("no async runtime available: {err}")))?;
        let resource = RestResource::new(client, &self.resource, &self.items_field);
        Ok(ResourceController::rest(
            resource,
            &self.config.controller,
            Arc::new(scheduler),
        ))
    }
}
