use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Classification of a single pair execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Not executed yet.
    #[default]
    Pending,
    /// The client exited cleanly.
    Success,
    /// The pair ran, but the implementation under test failed.
    ApplicationFailure,
    /// The harness could not start or monitor the pair.
    HarnessFailure,
}

impl Outcome {
    /// True only for a clean client exit.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Short label used in console lines and failure records.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::ApplicationFailure => "FAILURE",
            Outcome::HarnessFailure => "HARNESS FAILURE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One side of a pair: a language implementation's client or server.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Language name from the catalog.
    pub name: String,
    /// Program followed by its fixed arguments.
    pub command: Vec<String>,
    /// Working directory, relative to the harness work dir unless absolute.
    pub workdir: PathBuf,
    /// Client only: maximum time to wait for the client to exit.
    pub timeout: Option<Duration>,
    /// Server only: time to let the server start before the client runs.
    pub delay: Option<Duration>,
}

impl Endpoint {
    /// Program to execute, the first element of the command.
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments for a run on `port` with the given protocol and transport.
    pub fn args(&self, port: u16, protocol: &str, transport: &str) -> Vec<String> {
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        args.push(format!("--port={}", port));
        args.push(format!("--protocol={}", protocol));
        args.push(format!("--transport={}", transport));
        args
    }

    /// Full command line, for logs and failure records.
    pub fn command_line(&self, port: u16, protocol: &str, transport: &str) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.args(port, protocol, transport));
        parts.join(" ")
    }
}

/// Log files written by the client and server of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairLogs {
    pub client: PathBuf,
    pub server: PathBuf,
}

impl PairLogs {
    /// `<stem>_client.log` and `<stem>_server.log` inside `log_dir`.
    pub fn in_dir(log_dir: &Path, stem: &str) -> Self {
        Self {
            client: log_dir.join(format!("{}_client.log", stem)),
            server: log_dir.join(format!("{}_server.log", stem)),
        }
    }
}

/// A matched client/server implementation under test.
#[derive(Debug, Clone)]
pub struct Pair {
    pub client: Endpoint,
    pub server: Endpoint,
    pub protocol: String,
    pub transport: String,
    /// Port assigned at dispatch.
    pub port: Option<u16>,
    pub outcome: Outcome,
    /// Client exit code, when the client ran to completion.
    pub return_code: Option<i32>,
    /// Error captured while running the pair.
    pub error: Option<String>,
    pub logs: PairLogs,
}

impl Pair {
    /// A pending pair whose logs live under `log_dir`.
    pub fn new(
        client: Endpoint,
        server: Endpoint,
        protocol: impl Into<String>,
        transport: impl Into<String>,
        log_dir: &Path,
    ) -> Self {
        let protocol = protocol.into();
        let transport = transport.into();
        let stem = format!(
            "{}-{}_{}_{}",
            client.name, server.name, protocol, transport
        );
        Self {
            client,
            server,
            protocol,
            transport,
            port: None,
            outcome: Outcome::Pending,
            return_code: None,
            error: None,
            logs: PairLogs::in_dir(log_dir, &stem),
        }
    }

    /// `<client>-<server>`, the identity shown in the console table.
    pub fn name(&self) -> String {
        format!("{}-{}", self.client.name, self.server.name)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name(), self.protocol, self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, command: &[&str]) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            workdir: PathBuf::from("."),
            timeout: None,
            delay: None,
        }
    }

    #[test]
    fn test_endpoint_args_append_run_flags() {
        let ep = endpoint("go", &["frugalClient", "--verbose"]);
        assert_eq!(
            ep.args(9001, "binary", "http"),
            vec![
                "--verbose".to_string(),
                "--port=9001".to_string(),
                "--protocol=binary".to_string(),
                "--transport=http".to_string(),
            ]
        );
        assert_eq!(
            ep.command_line(9001, "binary", "http"),
            "frugalClient --verbose --port=9001 --protocol=binary --transport=http"
        );
    }

    #[test]
    fn test_pair_log_paths() {
        let pair = Pair::new(
            endpoint("go", &["c"]),
            endpoint("java", &["s"]),
            "json",
            "stateless",
            Path::new("log"),
        );
        assert_eq!(
            pair.logs.client,
            PathBuf::from("log/go-java_json_stateless_client.log")
        );
        assert_eq!(
            pair.logs.server,
            PathBuf::from("log/go-java_json_stateless_server.log")
        );
        assert_eq!(pair.to_string(), "go-java (json, stateless)");
        assert_eq!(pair.outcome, Outcome::Pending);
    }

    #[test]
    fn test_outcome_labels() {
        assert!(Outcome::Success.is_success());
        assert!(!Outcome::HarnessFailure.is_success());
        assert_eq!(Outcome::ApplicationFailure.to_string(), "FAILURE");
    }
}
