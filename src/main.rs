//! CLI entry point for mvision-devices: lists managed devices from the
//! Trellix MVISION ePO API.
//!
//! Logs in with OAuth2 client credentials, then prints each device record
//! as indented JSON on stdout followed by an `End of results` line.
//!
//! stdout carries only device records and the `End of results` line, so it
//! can be piped into other tools. Login and setup errors, the `--proxies`
//! parse warning, an early-stop warning and all `tracing` output go to
//! stderr.
//!
//! Exit codes:
//! - 0: success, including a listing cut short by a failed page request
//! - 1: setup or authentication failure
//! - 2: argument validation error (clap handles this automatically)

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use mvision_devices::auth::Credentials;
use mvision_devices::devices::{DEFAULT_PAGE_SIZE, Device, ListOptions, Termination};
use mvision_devices::logging::{self, DEFAULT_LOG_LEVEL, LogConfig};
use mvision_devices::proxy::ProxyConfig;
use mvision_devices::query::{QueryOptions, query_devices};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The Client ID of your MVISION API client.
    #[arg(long = "client_id")]
    client_id: String,

    /// The Client Secret of your MVISION API client. Prefer the
    /// MVISION_CLIENT_SECRET environment variable so the secret stays out
    /// of process listings and shell history.
    #[arg(long = "client_secret", env = "MVISION_CLIENT_SECRET")]
    client_secret: String,

    /// The API key sent as x-api-key.
    #[arg(long = "api_key", env = "MVISION_API_KEY")]
    api_key: String,

    /// The results page size.
    #[arg(long = "page_size", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// The maximum number of devices to print.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    limit: usize,

    /// JSON object with 'http' and 'https' proxy URLs.
    #[arg(long)]
    proxies: Option<String>,

    /// Log filter directive (RUST_LOG overrides it).
    #[arg(long = "log-level", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

/// Parses `--proxies`, falling back to no proxy with a warning when the
/// JSON is malformed.
fn resolve_proxies(raw: Option<&str>) -> Option<ProxyConfig> {
    let raw = raw?;
    match ProxyConfig::from_json(raw) {
        Ok(cfg) if cfg.is_empty() => None,
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("WARNING: failure parsing proxies: {e}: proxies provided: {raw}");
            warn!(error = %e, "ignoring malformed --proxies");
            None
        }
    }
}

/// Renders a record as JSON indented by four spaces.
fn format_device(device: &Device) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    device.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = logging::init(&LogConfig::new(&args.log_level)) {
        eprintln!("Warning: could not initialise logging: {e}");
    }

    let proxies = resolve_proxies(args.proxies.as_deref());
    let options = QueryOptions::new(
        Credentials::new(&args.client_id, &args.client_secret, &args.api_key),
        ListOptions {
            page_size: args.page_size,
            limit: args.limit,
        },
    )
    .with_proxies(proxies);

    let mut pager = match query_devices(options).await {
        Ok(pager) => pager,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    while let Some(device) = pager.next_device().await {
        match format_device(&device) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Warning: could not format device record: {e}"),
        }
    }

    if let Some(Termination::Failed(e)) = pager.termination() {
        eprintln!("Warning: device listing stopped early: {e}");
    }
    println!("End of results");

    ExitCode::SUCCESS
}
