//! Tracing subscriber setup for the `dh` binary.
//!
//! Logs go to stderr so stdout stays clean for `--json` output. The
//! filter comes from `RUST_LOG` when set, else `debug` with `--verbose`,
//! else `warn`.

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    // a second init (tests) is a no-op
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
