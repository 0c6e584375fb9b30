//! Console reporting.
//!
//! A header before dispatch, one line per completed pair, and a footer with
//! the totals. Lines are written whole, so concurrent workers never
//! interleave within a line.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use owo_colors::OwoColorize;

use crate::catalog::{Outcome, Pair};

const PAIR_WIDTH: usize = 40;
const COLUMN_WIDTH: usize = 14;

/// Sink for run progress.
pub trait Reporter: Send + Sync {
    /// Called once before any pair is dispatched.
    fn header(&self);
    /// Called once per finished pair, from any worker.
    fn pair_result(&self, pair: &Pair);
    /// Called once after every pair finished.
    fn footer(&self, failed: u64, total: u64, elapsed: Duration);
}

/// Column header line.
pub fn format_header() -> String {
    format!(
        "{:<pw$}{:<cw$}{:<cw$}{}",
        "client-server:",
        "protocol:",
        "transport:",
        "result:",
        pw = PAIR_WIDTH,
        cw = COLUMN_WIDTH
    )
}

/// One result line for `pair`.
pub fn format_pair_line(pair: &Pair, color: bool) -> String {
    let result = pair.outcome.label();
    let result = if !color {
        result.to_string()
    } else {
        match pair.outcome {
            Outcome::Success => result.green().to_string(),
            Outcome::ApplicationFailure => result.red().to_string(),
            Outcome::HarnessFailure => result.magenta().bold().to_string(),
            Outcome::Pending => result.dimmed().to_string(),
        }
    };
    format!(
        "{:<pw$}{:<cw$}{:<cw$}{}",
        pair.name(),
        pair.protocol,
        pair.transport,
        result,
        pw = PAIR_WIDTH,
        cw = COLUMN_WIDTH
    )
}

/// Footer line with totals.
pub fn format_footer(failed: u64, total: u64, elapsed: Duration) -> String {
    format!(
        "{} failed / {} total ({:.2}s elapsed)",
        failed,
        total,
        elapsed.as_secs_f64()
    )
}

/// Writes the table to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    color: bool,
}

impl ConsoleReporter {
    /// Colour is used only when requested and stdout is a terminal.
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    fn emit(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }
}

impl Reporter for ConsoleReporter {
    fn header(&self) {
        let rule = "-".repeat(PAIR_WIDTH + 3 * COLUMN_WIDTH);
        self.emit(&rule);
        self.emit(&format_header());
        self.emit(&rule);
    }

    fn pair_result(&self, pair: &Pair) {
        self.emit(&format_pair_line(pair, self.color));
    }

    fn footer(&self, failed: u64, total: u64, elapsed: Duration) {
        let rule = "-".repeat(PAIR_WIDTH + 3 * COLUMN_WIDTH);
        self.emit(&rule);
        let line = format_footer(failed, total, elapsed);
        if self.color {
            if failed > 0 {
                self.emit(&line.red().to_string());
            } else {
                self.emit(&line.green().to_string());
            }
        } else {
            self.emit(&line);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that keeps every line in memory.
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub lines: Mutex<Vec<String>>,
        pub results: Mutex<Vec<(String, Outcome)>>,
    }

    impl RecordingReporter {
        pub fn results(&self) -> Vec<(String, Outcome)> {
            self.results.lock().expect("results").clone()
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().expect("lines").clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn header(&self) {
            self.lines.lock().expect("lines").push(format_header());
        }

        fn pair_result(&self, pair: &Pair) {
            self.lines
                .lock()
                .expect("lines")
                .push(format_pair_line(pair, false));
            self.results
                .lock()
                .expect("results")
                .push((pair.to_string(), pair.outcome));
        }

        fn footer(&self, failed: u64, total: u64, elapsed: Duration) {
            self.lines
                .lock()
                .expect("lines")
                .push(format_footer(failed, total, elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Endpoint;
    use std::path::{Path, PathBuf};

    fn pair(outcome: Outcome) -> Pair {
        let endpoint = |name: &str| Endpoint {
            name: name.to_string(),
            command: vec!["bin".to_string()],
            workdir: PathBuf::from("."),
            timeout: None,
            delay: None,
        };
        let mut pair = Pair::new(
            endpoint("go"),
            endpoint("java"),
            "binary",
            "http",
            Path::new("log"),
        );
        pair.outcome = outcome;
        pair
    }

    #[test]
    fn test_pair_line_columns() {
        let line = format_pair_line(&pair(Outcome::Success), false);
        assert!(line.starts_with("go-java "));
        assert_eq!(&line[PAIR_WIDTH..PAIR_WIDTH + 6], "binary");
        assert!(line.ends_with("success"));
    }

    #[test]
    fn test_pair_line_failure_labels() {
        assert!(format_pair_line(&pair(Outcome::ApplicationFailure), false).ends_with("FAILURE"));
        assert!(format_pair_line(&pair(Outcome::HarnessFailure), false)
            .ends_with("HARNESS FAILURE"));
    }

    #[test]
    fn test_colored_line_keeps_label() {
        let line = format_pair_line(&pair(Outcome::ApplicationFailure), true);
        assert!(line.contains("FAILURE"));
        assert!(line.contains("\u{1b}["));
    }

    #[test]
    fn test_footer() {
        let footer = format_footer(1, 3, Duration::from_millis(1500));
        assert_eq!(footer, "1 failed / 3 total (1.50s elapsed)");
    }
}
