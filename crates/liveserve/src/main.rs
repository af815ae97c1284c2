//! liveserve CLI - Static file server with change notifications.
//!
//! Serves a directory over HTTP, opens it in the default browser and prints
//! a reminder whenever an HTML, CSS or JavaScript file is modified.

mod browser;
mod error;
mod output;
mod serve;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use error::CliError;
use output::Output;
use serve::ServeArgs;

/// liveserve - Serve a directory and watch it for changes.
#[derive(Parser)]
#[command(name = "liveserve", version, about)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

/// Default log filter: warnings plus one access line per request.
const DEFAULT_FILTER: &str = "warn,liveserve::access=info";

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or the default filter
    let filter = if cli.serve.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|rt| rt.block_on(cli.serve.execute()));

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
