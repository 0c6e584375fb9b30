//! Failure record formatting and pair log helpers.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;

use crate::catalog::Pair;

/// Prefix of the first line of every failure record.
pub const RECORD_MARKER: &str = "######## ";

const NO_OUTPUT: &str = "(no output captured)";

/// Append a full record of `pair` to `out`: identity, outcome, commands, then
/// the contents of the client and server logs.
pub fn append_failure_record<W: Write>(out: &mut W, pair: &Pair) -> io::Result<()> {
    let port = pair.port.unwrap_or_default();

    writeln!(out, "{}{} on port {}", RECORD_MARKER, pair, port)?;
    writeln!(out, "recorded: {}", Utc::now().to_rfc3339())?;
    match pair.return_code {
        Some(code) => writeln!(out, "outcome: {} (exit code {})", pair.outcome, code)?,
        None => writeln!(out, "outcome: {}", pair.outcome)?,
    }
    if let Some(error) = &pair.error {
        writeln!(out, "error: {}", error)?;
    }
    writeln!(
        out,
        "client: {} (in {})",
        pair.client
            .command_line(port, &pair.protocol, &pair.transport),
        pair.client.workdir.display()
    )?;
    writeln!(
        out,
        "server: {} (in {})",
        pair.server
            .command_line(port, &pair.protocol, &pair.transport),
        pair.server.workdir.display()
    )?;

    copy_log(out, "client", &pair.logs.client)?;
    copy_log(out, "server", &pair.logs.server)?;
    writeln!(out)?;
    Ok(())
}

fn copy_log<W: Write>(out: &mut W, role: &str, path: &Path) -> io::Result<()> {
    writeln!(out, "---- {} log: {} ----", role, path.display())?;
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => writeln!(out, "{}", NO_OUTPUT),
        Ok(bytes) => {
            out.write_all(&bytes)?;
            if !bytes.ends_with(b"\n") {
                writeln!(out)?;
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => writeln!(out, "{}", NO_OUTPUT),
        Err(err) => Err(err),
    }
}

/// Append harness-generated explanatory text to a pair's log file, creating
/// the file when the pair never got far enough to write it.
pub fn write_harness_error_context(target: &Path, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(target)?;
    writeln!(file, "[crossrunner {}] {}", Utc::now().to_rfc3339(), message)?;
    file.sync_all()
}
