//! Diagnostic logging setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise the harness logs at `info`, or
/// `debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "crossrunner=debug"
    } else {
        "crossrunner=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
