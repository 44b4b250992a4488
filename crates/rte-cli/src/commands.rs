use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rte_core::normalize_title;
use rte_notify::{HttpRelayConfig, HttpRelayNotifier, LogOnlyNotifier, Notifier};
use rte_routing::SecretOverrides;
use rte_runtime::{
    AccountRegistry, DispatchError, DispatchOutcome, DuplicateCounter, InboundDispatcher,
    InboundReport, RuntimeConfig, StandardProviderFactory, SystemClock, TicketLifecycleController,
};
use rte_tracker::{GithubProviderConfig, RetryPolicy};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinSet};

use crate::cli_args::{Cli, CliCommand, IngestArgs};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let config = runtime_config(&cli);
    match &cli.command {
        CliCommand::Ingest(args) => run_ingest(&cli, &config, args).await,
        CliCommand::Serve => run_serve(&cli, &config).await,
        CliCommand::Normalize { title } => {
            println!("{}", normalize_title(Some(title)));
            Ok(())
        }
        CliCommand::History { body_file } => {
            let body = read_body(body_file.as_deref())?;
            let decoded = config.history_codec().decode(&body);
            println!("{}", serde_json::to_string_pretty(&decoded)?);
            Ok(())
        }
    }
}

pub(crate) fn runtime_config(cli: &Cli) -> RuntimeConfig {
    RuntimeConfig {
        sparkline_url_template: cli.sparkline_url.clone(),
        history_namespace: cli.history_namespace.clone(),
        history_retention_days: cli.history_retention_days,
        github: GithubProviderConfig {
            api_base: cli.github_api_base.clone(),
            request_timeout_ms: cli.request_timeout_ms,
            retry: RetryPolicy::new(cli.retry_max_attempts, cli.retry_base_delay_ms),
            search_max_pages: cli.github_search_max_pages,
        },
        notify_from: cli.notify_from.clone(),
    }
}

fn build_notifier(cli: &Cli) -> Result<Arc<dyn Notifier>> {
    let Some(url) = cli
        .notify_relay_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return Ok(Arc::new(LogOnlyNotifier));
    };
    let notifier = HttpRelayNotifier::new(&HttpRelayConfig {
        url: url.to_string(),
        bearer_token: cli.notify_relay_token.clone(),
        request_timeout_ms: cli.request_timeout_ms,
    })
    .context("failed to create notification relay client")?;
    Ok(Arc::new(notifier))
}

fn build_dispatcher(cli: &Cli, config: &RuntimeConfig) -> Result<InboundDispatcher> {
    let controller = TicketLifecycleController::new(
        Arc::new(DuplicateCounter::new()),
        config.history_codec(),
        build_notifier(cli)?,
        Arc::new(SystemClock),
        config.notify_from.clone(),
    );
    let registry = AccountRegistry::new(Arc::new(StandardProviderFactory::new(
        config.github.clone(),
    )));
    Ok(InboundDispatcher::new(
        Arc::new(registry),
        Arc::new(controller),
        SecretOverrides::from_env(),
    ))
}

async fn run_ingest(cli: &Cli, config: &RuntimeConfig, args: &IngestArgs) -> Result<()> {
    let body = read_body(args.body_file.as_deref())?;
    let dispatcher = build_dispatcher(cli, config)?;

    let report = InboundReport {
        from: args.from.clone(),
        subject: args.subject.clone(),
        body,
        in_reply_to: args.in_reply_to.clone(),
    };
    let outcome = dispatcher
        .dispatch(&report)
        .await
        .context("failed to ingest report")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

type ServeResult = (usize, Result<DispatchOutcome, DispatchError>);

async fn run_serve(cli: &Cli, config: &RuntimeConfig) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(cli, config)?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: JoinSet<ServeResult> = JoinSet::new();
    let mut line_number = 0_usize;

    loop {
        tokio::select! {
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                emit_serve_record(joined);
            }
            next = lines.next_line() => {
                let Some(line) = next.context("failed to read report from stdin")? else {
                    break;
                };
                line_number += 1;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let report = match serde_json::from_str::<InboundReport>(trimmed) {
                    Ok(report) => report,
                    Err(error) => {
                        tracing::warn!(line = line_number, %error, "rejected malformed report");
                        print_record(json!({
                            "line": line_number,
                            "dispatch": "rejected",
                            "error": error.to_string(),
                        }));
                        continue;
                    }
                };
                let dispatcher = Arc::clone(&dispatcher);
                let report_line = line_number;
                in_flight.spawn(async move { (report_line, dispatcher.dispatch(&report).await) });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        emit_serve_record(joined);
    }
    tracing::debug!(reports = line_number, "report stream closed");
    Ok(())
}

fn emit_serve_record(joined: Result<ServeResult, JoinError>) {
    let record = match joined {
        Ok((line, Ok(outcome))) => {
            let mut record = serde_json::to_value(&outcome).unwrap_or_else(
                |error| json!({ "dispatch": "failed", "error": error.to_string() }),
            );
            if let Value::Object(fields) = &mut record {
                fields.insert("line".to_string(), Value::from(line));
            }
            record
        }
        Ok((line, Err(error))) => {
            tracing::warn!(line, %error, "report dispatch failed");
            json!({ "line": line, "dispatch": "failed", "error": error.to_string() })
        }
        Err(error) => {
            tracing::warn!(%error, "report dispatch task aborted");
            json!({ "dispatch": "failed", "error": error.to_string() })
        }
    };
    print_record(record);
}

fn print_record(record: Value) {
    println!("{record}");
}

fn read_body(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read body from {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("failed to read body from stdin")?;
            Ok(body)
        }
    }
}
