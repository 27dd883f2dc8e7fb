mod cli;
mod commands;
mod metrics_runtime;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::metrics_runtime::CountingSink;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sink = CountingSink::install();

    let mut stdout = std::io::stdout().lock();
    let result = commands::run(&cli, &mut stdout);

    if let Some(sink) = sink {
        sink.log_totals();
    }
    result
}
