//! Subprocess pair runner.
//!
//! Starts the server, gives it its startup delay, runs the client to
//! completion, then stops the server. Both processes write stdout and stderr
//! to the pair's log files.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::process::{Child, Command};

use super::PairRunner;
use crate::catalog::{Endpoint, Outcome, Pair};

/// Errors that stop the harness from starting or monitoring a pair.
#[derive(Error, Debug)]
enum RunError {
    #[error("Unable to create log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to start {role} '{program}': {source}")]
    Spawn {
        role: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to wait for client '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

enum ClientExit {
    Exited(ExitStatus),
    TimedOut(Duration),
}

/// Runs pairs as real client and server processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    work_dir: PathBuf,
}

impl ProcessRunner {
    /// Endpoint working directories are resolved against `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    async fn execute(&self, pair: &Pair, port: u16) -> Result<ClientExit, RunError> {
        let server_log = open_log(&pair.logs.server, &pair.server, pair, port)?;
        let client_log = open_log(&pair.logs.client, &pair.client, pair, port)?;

        let mut server = self.spawn(
            "server",
            &pair.server,
            pair,
            port,
            server_log,
            &pair.logs.server,
        )?;
        tracing::debug!(pair = %pair, port, "server started");

        if let Some(delay) = pair.server.delay {
            tokio::time::sleep(delay).await;
        }

        let spawned = self.spawn(
            "client",
            &pair.client,
            pair,
            port,
            client_log,
            &pair.logs.client,
        );
        let client = match spawned {
            Ok(client) => client,
            Err(err) => {
                stop(&mut server).await;
                return Err(err);
            }
        };

        let exit = wait_client(client, &pair.client).await;
        stop(&mut server).await;
        exit
    }

    fn spawn(
        &self,
        role: &'static str,
        endpoint: &Endpoint,
        pair: &Pair,
        port: u16,
        log: File,
        log_path: &Path,
    ) -> Result<Child, RunError> {
        let log_error = |source| RunError::LogFile {
            path: log_path.to_path_buf(),
            source,
        };
        let stderr = log.try_clone().map_err(log_error)?;

        Command::new(endpoint.program())
            .args(endpoint.args(port, &pair.protocol, &pair.transport))
            .current_dir(self.work_dir.join(&endpoint.workdir))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                role,
                program: endpoint.program().to_string(),
                source,
            })
    }
}

#[async_trait]
impl PairRunner for ProcessRunner {
    async fn run(&self, pair: &mut Pair, port: u16) -> Outcome {
        pair.port = Some(port);

        let outcome = match self.execute(pair, port).await {
            Ok(ClientExit::Exited(status)) if status.success() => {
                pair.return_code = status.code();
                Outcome::Success
            }
            Ok(ClientExit::Exited(status)) => {
                pair.return_code = status.code();
                if status.code().is_none() {
                    pair.error = Some(format!("client terminated by signal ({})", status));
                }
                Outcome::ApplicationFailure
            }
            Ok(ClientExit::TimedOut(limit)) => {
                pair.error = Some(format!("client timed out after {:.1}s", limit.as_secs_f64()));
                Outcome::ApplicationFailure
            }
            Err(err) => {
                tracing::debug!(pair = %pair, error = %err, "harness failure");
                pair.error = Some(err.to_string());
                Outcome::HarnessFailure
            }
        };

        pair.outcome = outcome;
        outcome
    }
}

fn open_log(path: &Path, endpoint: &Endpoint, pair: &Pair, port: u16) -> Result<File, RunError> {
    let log_error = |source| RunError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(log_error)?;
    writeln!(
        file,
        "# {}\n# started {}",
        endpoint.command_line(port, &pair.protocol, &pair.transport),
        Utc::now().to_rfc3339()
    )
    .map_err(log_error)?;
    Ok(file)
}

async fn wait_client(mut client: Child, endpoint: &Endpoint) -> Result<ClientExit, RunError> {
    let wait_error = |source| RunError::Wait {
        program: endpoint.program().to_string(),
        source,
    };

    let Some(limit) = endpoint.timeout else {
        return client.wait().await.map(ClientExit::Exited).map_err(wait_error);
    };

    match tokio::time::timeout(limit, client.wait()).await {
        Ok(status) => status.map(ClientExit::Exited).map_err(wait_error),
        Err(_) => {
            if let Err(err) = client.kill().await {
                tracing::warn!(error = %err, "Unable to kill timed out client");
            }
            Ok(ClientExit::TimedOut(limit))
        }
    }
}

async fn stop(server: &mut Child) {
    if let Err(err) = server.start_kill() {
        // Already exited.
        tracing::trace!(error = %err, "server kill skipped");
    }
    if let Err(err) = server.wait().await {
        tracing::warn!(error = %err, "Unable to reap server process");
    }
}
