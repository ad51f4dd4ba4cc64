use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use roster_api_models::SortOrder;
use roster_config::{RosterConfig, load_with};
use roster_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use roster_ui::FilterCriteria;
use roster_ui::core::filters::DEFAULT_SORT_BY;

use crate::client::{AppContext, CliError, CliResult};
use crate::commands::{resources, session};

/// Parses CLI arguments, executes the requested command, and reports
/// failures on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let result = match AppContext::from_cli(&cli) {
        Ok(ctx) => dispatch(&ctx, cli.command).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(ctx: &AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::List(args) => resources::handle_list(ctx, args).await,
        Command::Create(args) => resources::handle_create(ctx, args).await,
        Command::Patch(args) => resources::handle_patch(ctx, args).await,
        Command::Delete(args) => resources::handle_delete(ctx, args).await,
        Command::Bulk(args) => resources::handle_bulk(ctx, args).await,
        Command::Export(args) => resources::handle_export(ctx, args).await,
        Command::Login(args) => session::handle_login(ctx, &args),
        Command::Logout => session::handle_logout(ctx),
    }
}

#[derive(Parser)]
#[command(name = "roster", about = "Headless client for paginated resource APIs")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "ROSTER_API_URL")]
    pub(crate) api_url: Option<String>,
    #[arg(long, global = true, env = "ROSTER_HTTP_TIMEOUT_SECS")]
    pub(crate) timeout: Option<u64>,
    #[arg(long, global = true, env = "ROSTER_TOKEN_FILE")]
    pub(crate) token_file: Option<PathBuf>,
    #[arg(long, global = true, env = "ROSTER_PER_PAGE")]
    pub(crate) per_page: Option<u32>,
    #[arg(
        long,
        global = true,
        default_value = "users",
        help = "Resource path under the API root"
    )]
    pub(crate) resource: String,
    #[arg(
        long,
        global = true,
        help = "Response field holding the item list (defaults to the last path segment)"
    )]
    pub(crate) items_field: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, env = "ROSTER_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Cli {
    /// Layer flag values over `env`, then validate through the config loader.
    pub(crate) fn resolve_config<F>(&self, env: F) -> CliResult<RosterConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = self.config_overrides();
        load_with(|key| overrides.get(key).cloned().or_else(|| env(key)))
            .map_err(|err| CliError::validation(err.to_string()))
    }

    fn config_overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        if let Some(url) = &self.api_url {
            overrides.insert("ROSTER_API_URL", url.clone());
        }
        if let Some(timeout) = self.timeout {
            overrides.insert("ROSTER_HTTP_TIMEOUT_SECS", timeout.to_string());
        }
        if let Some(path) = &self.token_file {
            overrides.insert("ROSTER_TOKEN_FILE", path.display().to_string());
        }
        if let Some(per_page) = self.per_page {
            overrides.insert("ROSTER_PER_PAGE", per_page.to_string());
        }
        overrides
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List one page of items.
    List(ListArgs),
    /// Create an item from a JSON object.
    Create(CreateArgs),
    /// Update an item with a JSON object.
    Patch(PatchArgs),
    /// Delete one item after confirmation.
    Delete(DeleteArgs),
    /// Run a named bulk action over several items.
    Bulk(BulkArgs),
    /// Export one page as CSV.
    Export(ExportArgs),
    /// Store a bearer token in the session file.
    Login(LoginArgs),
    /// Remove the stored bearer token.
    Logout,
}

#[derive(Args, Clone)]
pub(crate) struct FilterArgs {
    #[arg(long, help = "Free-text search")]
    pub(crate) search: Option<String>,
    #[arg(long = "type", help = "Filter by resource type")]
    pub(crate) kind: Option<String>,
    #[arg(long, help = "Filter by status")]
    pub(crate) status: Option<String>,
    #[arg(long, default_value = DEFAULT_SORT_BY)]
    pub(crate) sort_by: String,
    #[arg(long, value_enum, default_value_t = SortArg::Desc)]
    pub(crate) order: SortArg,
}

impl FilterArgs {
    pub(crate) fn criteria(&self) -> FilterCriteria {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let sort_by = self.sort_by.trim();
        FilterCriteria {
            search: self.search.clone().unwrap_or_default(),
            kind: non_blank(&self.kind),
            status: non_blank(&self.status),
            sort_by: if sort_by.is_empty() {
                DEFAULT_SORT_BY.to_string()
            } else {
                sort_by.to_string()
            },
            sort_order: self.order.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Asc => Self::Asc,
            SortArg::Desc => Self::Desc,
        }
    }
}

#[derive(Args)]
pub(crate) struct ListArgs {
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) page: u32,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    #[arg(long, value_delimiter = ',', help = "Columns to show after the id")]
    pub(crate) columns: Vec<String>,
}

#[derive(Args)]
pub(crate) struct CreateArgs {
    #[arg(long, help = "JSON object sent as the request body")]
    pub(crate) data: String,
}

#[derive(Args)]
pub(crate) struct PatchArgs {
    #[arg(help = "Item identifier")]
    pub(crate) id: String,
    #[arg(long, help = "JSON object sent as the request body")]
    pub(crate) data: String,
    #[arg(long, help = "Replace the item with PUT instead of patching it")]
    pub(crate) replace: bool,
}

#[derive(Args)]
pub(crate) struct DeleteArgs {
    #[arg(help = "Item identifier")]
    pub(crate) id: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args)]
pub(crate) struct BulkArgs {
    #[arg(help = "Action name; `delete` deletes each item individually")]
    pub(crate) action: String,
    #[arg(required = true, help = "Item identifiers")]
    pub(crate) ids: Vec<String>,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt for deletes")]
    pub(crate) yes: bool,
}

#[derive(Args)]
pub(crate) struct ExportArgs {
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) page: u32,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    #[arg(long, value_delimiter = ',', help = "CSV columns (defaults to every field)")]
    pub(crate) columns: Vec<String>,
    #[arg(long, short = 'o', help = "Write to this file instead of stdout")]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, env = "ROSTER_TOKEN", hide_env_values = true)]
    pub(crate) token: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("roster").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn list_filters_build_criteria() {
        let cli = parse(&[
            "list", "--search", "ann", "--type", " ", "--status", "active", "--order", "asc",
        ]);
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        let criteria = args.filters.criteria();
        assert_eq!(criteria.search, "ann");
        assert_eq!(criteria.kind, None);
        assert_eq!(criteria.status.as_deref(), Some("active"));
        assert_eq!(criteria.sort_by, DEFAULT_SORT_BY);
        assert_eq!(criteria.sort_order, SortOrder::Asc);
        assert_eq!(args.page, 1);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(Cli::try_parse_from(["roster", "list", "--page", "0"]).is_err());
    }

    #[test]
    fn bulk_requires_ids() {
        assert!(Cli::try_parse_from(["roster", "bulk", "activate"]).is_err());
        let cli = parse(&["bulk", "activate", "1", "2", "--yes"]);
        let Command::Bulk(args) = cli.command else {
            panic!("expected bulk command");
        };
        assert_eq!(args.ids, vec!["1", "2"]);
        assert!(args.yes);
    }

    #[test]
    fn flags_override_environment() {
        let cli = parse(&[
            "--api-url",
            "http://flag.example",
            "--timeout",
            "7",
            "--per-page",
            "50",
            "logout",
        ]);
        let config = cli
            .resolve_config(|key| match key {
                "ROSTER_API_URL" => Some("http://env.example".to_string()),
                "ROSTER_DEBOUNCE_MS" => Some("250".to_string()),
                _ => None,
            })
            .expect("config resolves");
        assert_eq!(config.client.base_url.as_str(), "http://flag.example/");
        assert_eq!(config.client.request_timeout, Duration::from_secs(7));
        assert_eq!(config.controller.per_page, 50);
        assert_eq!(config.controller.debounce, Duration::from_millis(250));
    }

    #[test]
    fn invalid_config_is_a_validation_error() {
        let cli = parse(&["--api-url", "not a url", "logout"]);
        let err = cli.resolve_config(|_| None).expect_err("invalid url");
        assert_eq!(err.exit_code(), 2);
    }
}
