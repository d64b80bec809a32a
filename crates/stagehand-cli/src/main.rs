use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use stagehand_core::stages::parse_test_stages;

mod prompt;
mod runner;
mod wizard;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "A CLI frontend for driving staged infrastructure test workflows", long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Path to directory containing the go test package that uses test stages
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Name of the go test package to collect Test functions from
    #[arg(long, default_value = "test")]
    package: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn as_tracing_level(self) -> tracing::Level {
        match self {
            // tracing has no level above error; panic and fatal collapse.
            LogLevel::Panic | LogLevel::Fatal | LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level.as_tracing_level())
        .init();

    // A package that cannot be analyzed at startup is a fatal configuration
    // error. Later re-analysis failures are handled inside the wizard.
    let stage_map = parse_test_stages(&cli.path, &cli.package).with_context(|| {
        format!(
            "failed to analyze test package {} in {}",
            cli.package,
            cli.path.display()
        )
    })?;

    wizard::run(&cli.path, &cli.package, stage_map).await
}
