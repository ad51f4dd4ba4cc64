//! List, mutation, bulk, and export commands.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, anyhow};
use roster_api_models::{Record, ResourceId};
use roster_client::ApiError;
use roster_ui::{
    ApplyOutcome, BulkReport, ConfirmedOutcome, FilterCriteria, ResourceController, RunOutcome,
};
use serde_json::Value;
use tracing::info;

use crate::cli::{BulkArgs, CreateArgs, DeleteArgs, ExportArgs, ListArgs, PatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{print_toasts, render_bulk, render_page, render_record};

const BULK_DELETE: &str = "delete";

pub(crate) async fn handle_list(ctx: &AppContext, args: ListArgs) -> CliResult<()> {
    let controller = ctx.controller()?;
    load_page(&controller, args.page, args.filters.criteria()).await?;
    render_page(&controller.snapshot().page, &args.columns, ctx.output)
}

pub(crate) async fn handle_create(ctx: &AppContext, args: CreateArgs) -> CliResult<()> {
    let body = parse_body(&args.data)?;
    let controller = ctx.controller()?;
    let created = finish_run(controller.create(body).await)?;
    print_toasts(&controller.snapshot().toasts);
    match created {
        Some(record) => render_record(&record, ctx.output),
        None => Ok(()),
    }
}

pub(crate) async fn handle_patch(ctx: &AppContext, args: PatchArgs) -> CliResult<()> {
    let body = parse_body(&args.data)?;
    let id = ResourceId::parse(&args.id);
    let controller = ctx.controller()?;
    let outcome = if args.replace {
        controller.update(id, body).await
    } else {
        controller.patch(id, body).await
    };
    let updated = finish_run(outcome)?;
    print_toasts(&controller.snapshot().toasts);
    match updated {
        Some(record) => render_record(&record, ctx.output),
        None => Ok(()),
    }
}

pub(crate) async fn handle_delete(ctx: &AppContext, args: DeleteArgs) -> CliResult<()> {
    let controller = ctx.controller()?;
    controller
        .request_delete(ResourceId::parse(&args.id))
        .map_err(CliError::from_gate)?;
    let Some(outcome) = run_confirmed(&controller, args.yes).await? else {
        return Ok(());
    };
    match outcome {
        ConfirmedOutcome::Deleted(run) => {
            finish_run(run)?;
            print_toasts(&controller.snapshot().toasts);
            Ok(())
        }
        ConfirmedOutcome::Bulk(run) => finish_bulk(run, ctx),
    }
}

pub(crate) async fn handle_bulk(ctx: &AppContext, args: BulkArgs) -> CliResult<()> {
    let action = args.action.trim();
    if action.is_empty() {
        return Err(CliError::validation("bulk action name must not be empty"));
    }
    let ids: Vec<ResourceId> = args.ids.iter().map(|id| ResourceId::parse(id)).collect();
    let controller = ctx.controller()?;

    if action.eq_ignore_ascii_case(BULK_DELETE) {
        controller
            .request_bulk_delete(ids)
            .map_err(CliError::from_gate)?;
        return match run_confirmed(&controller, args.yes).await? {
            Some(ConfirmedOutcome::Bulk(run)) => finish_bulk(run, ctx),
            Some(ConfirmedOutcome::Deleted(run)) => finish_run(run),
            None => Ok(()),
        };
    }

    let run = controller.bulk_action(action, ids).await;
    finish_bulk(run, ctx)
}

pub(crate) async fn handle_export(ctx: &AppContext, args: ExportArgs) -> CliResult<()> {
    let controller = ctx.controller()?;
    load_page(&controller, args.page, args.filters.criteria()).await?;
    let columns: Vec<&str> = args.columns.iter().map(String::as_str).collect();
    let csv = controller
        .export_csv(&columns)
        .map_err(|err| CliError::failure(anyhow!("failed to build CSV: {err}")))?;

    match &args.out {
        Some(path) => {
            fs::write(path, &csv)
                .with_context(|| format!("failed to write {}", path.display()))
                .map_err(CliError::failure)?;
            info!(
                path = %path.display(),
                rows = controller.snapshot().page.items.len(),
                "page exported"
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}

async fn load_page(
    controller: &ResourceController<Record>,
    page: u32,
    criteria: FilterCriteria,
) -> CliResult<()> {
    controller.set_filters(criteria);
    match controller.fetch(page.max(1)).await {
        ApplyOutcome::Applied | ApplyOutcome::Stale => Ok(()),
        ApplyOutcome::Failed(err) => Err(CliError::from_api(err)),
    }
}

/// Ask before running the gated action; `None` means the user declined.
async fn run_confirmed(
    controller: &ResourceController<Record>,
    assume_yes: bool,
) -> CliResult<Option<ConfirmedOutcome>> {
    let prompt = controller.snapshot().confirmation.unwrap_or_default();
    let accepted = if assume_yes {
        true
    } else {
        match prompt_on_terminal(&prompt) {
            Ok(answer) => answer,
            Err(err) => {
                controller.cancel().map_err(CliError::from_gate)?;
                return Err(err);
            }
        }
    };

    if !accepted {
        controller.cancel().map_err(CliError::from_gate)?;
        eprintln!("cancelled");
        return Ok(None);
    }
    controller
        .confirm()
        .await
        .map(Some)
        .map_err(CliError::from_gate)
}

fn prompt_on_terminal(prompt: &str) -> CliResult<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(CliError::validation(
            "confirmation required; pass --yes to run non-interactively",
        ));
    }
    eprint!("{prompt} [y/N] ");
    io::stderr()
        .flush()
        .context("failed to write prompt")
        .map_err(CliError::failure)?;
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("failed to read confirmation")
        .map_err(CliError::failure)?;
    Ok(answer_is_yes(&line))
}

fn answer_is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn parse_body(raw: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| CliError::validation(format!("request body is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(CliError::validation("request body must be a JSON object"));
    }
    Ok(value)
}

fn finish_run<R>(outcome: RunOutcome<R>) -> CliResult<R> {
    match outcome {
        RunOutcome::Done(value) => Ok(value),
        RunOutcome::Failed(err) => Err(CliError::from_api(err)),
        RunOutcome::Skipped => Err(CliError::failure(anyhow!(
            "another request for this item is still running"
        ))),
    }
}

fn finish_bulk(outcome: RunOutcome<BulkReport>, ctx: &AppContext) -> CliResult<()> {
    let report = finish_run(outcome)?;
    render_bulk(&report, ctx.output)?;
    if report.session_lost {
        return Err(CliError::from_api(ApiError::NoSession));
    }
    if report.succeeded.is_empty() && !report.failed.is_empty() {
        return Err(CliError::failure(anyhow!(report.summary())));
    }
    Ok(())
}
