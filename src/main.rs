use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use rulemine::cli::{run, write_report, Args};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let report = run(&args)?;
    write_report(std::io::stdout().lock(), &report)
}
