use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rte_core::{DEFAULT_HISTORY_NAMESPACE, DEFAULT_SPARKLINE_URL_TEMPLATE};
use rte_runtime::DEFAULT_NOTIFY_FROM;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "runtimeerror",
    about = "Turn runtime error reports into deduplicated tracker tickets",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "SPARKLINE_URL",
        default_value = DEFAULT_SPARKLINE_URL_TEMPLATE,
        help = "Chart URL template; {MIN}, {MAX} and {RAW} are substituted with the occurrence counts."
    )]
    pub(crate) sparkline_url: String,

    #[arg(
        long,
        env = "RUNTIMEERROR_HISTORY_NAMESPACE",
        default_value = DEFAULT_HISTORY_NAMESPACE,
        help = "Key of the occurrence history embedded in ticket bodies."
    )]
    pub(crate) history_namespace: String,

    #[arg(
        long,
        env = "RUNTIMEERROR_HISTORY_RETENTION_DAYS",
        default_value_t = 0,
        help = "Drop history days older than this many days. 7 keeps the trailing week; 0 keeps everything."
    )]
    pub(crate) history_retention_days: u32,

    #[arg(
        long,
        env = "RUNTIMEERROR_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "Base URL of the GitHub REST API."
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long,
        env = "RUNTIMEERROR_REQUEST_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Timeout for tracker and relay HTTP requests."
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long,
        env = "RUNTIMEERROR_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per tracker request, including the first."
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long,
        env = "RUNTIMEERROR_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff."
    )]
    pub(crate) retry_base_delay_ms: u64,

    #[arg(
        long,
        env = "RUNTIMEERROR_GITHUB_SEARCH_MAX_PAGES",
        default_value_t = 5,
        value_parser = parse_positive_u32,
        help = "Issue-list pages scanned when looking up a ticket by title."
    )]
    pub(crate) github_search_max_pages: u32,

    #[arg(
        long,
        env = "RUNTIMEERROR_NOTIFY_RELAY_URL",
        help = "HTTP relay that delivers reporter notifications. Notifications are only logged when unset."
    )]
    pub(crate) notify_relay_url: Option<String>,

    #[arg(
        long,
        env = "RUNTIMEERROR_NOTIFY_RELAY_TOKEN",
        hide_env_values = true,
        help = "Bearer token sent to the notification relay."
    )]
    pub(crate) notify_relay_token: Option<String>,

    #[arg(
        long,
        env = "RUNTIMEERROR_NOTIFY_FROM",
        default_value = DEFAULT_NOTIFY_FROM,
        help = "Sender address on reporter notifications."
    )]
    pub(crate) notify_from: String,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Route one inbound report and print the outcome as JSON.
    Ingest(IngestArgs),
    /// Read newline-delimited report JSON from stdin and print one outcome per line.
    ///
    /// Reports are dispatched concurrently through one shared dispatcher, so a
    /// burst of the same error folds into a single ticket write.
    Serve,
    /// Print the generic title for a raw error title.
    Normalize { title: String },
    /// Decode the occurrence history embedded in a ticket body.
    History {
        #[arg(long, help = "Read the body from this file instead of stdin.")]
        body_file: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub(crate) struct IngestArgs {
    #[arg(long, help = "Sender, e.g. '\"owner/repo\" <secret+label@github.example.com>'.")]
    pub(crate) from: String,

    #[arg(long, help = "Report subject; becomes the ticket title.")]
    pub(crate) subject: String,

    #[arg(long, help = "In-Reply-To/References header of a reply to a ticket notification.")]
    pub(crate) in_reply_to: Option<String>,

    #[arg(long, help = "Read the body from this file instead of stdin.")]
    pub(crate) body_file: Option<PathBuf>,
}
