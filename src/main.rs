use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use crossrunner::trace::init_tracing;
use crossrunner::{ConsoleReporter, Harness, HarnessConfig, HarnessError, ProcessRunner};

/// Exit code for runs aborted by the harness itself.
const FATAL_EXIT: u8 = 2;

/// Run every client/server pair from a test definitions file.
#[derive(Parser, Debug)]
#[command(name = "crossrunner", author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON test definitions
    definitions: PathBuf,

    /// TOML config file (defaults to ./crossrunner.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory pairs run relative to
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Port for the first pair
    #[arg(long, value_name = "PORT")]
    base_port: Option<u16>,

    /// Number of concurrent workers (default: twice the CPU count)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Where to move the failure log when a pair fails
    #[arg(long, value_name = "FILE")]
    artifact_path: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn harness_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir);
        }
        if let Some(port) = self.base_port {
            config = config.with_base_port(port);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(path) = &self.artifact_path {
            config = config.with_artifact_path(path);
        }
        if self.no_color {
            config = config.with_color(false);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.harness_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            return ExitCode::from(FATAL_EXIT);
        }
    };

    let runner = Arc::new(ProcessRunner::new(config.work_dir.clone()));
    let reporter = Arc::new(ConsoleReporter::new(config.color));
    let harness = Harness::new(config, runner, reporter);

    match harness.run(&cli.definitions).await {
        Ok(summary) => ExitCode::from(summary.exit_code()),
        Err(err) => {
            tracing::error!(error = %err, "Run aborted");
            eprintln!("crossrunner: {}", err);
            ExitCode::from(FATAL_EXIT)
        }
    }
}
