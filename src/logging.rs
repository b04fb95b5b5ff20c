//! Tracing subscriber setup for the `rowfold` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application.

use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count: 0 → info, 1 → debug, 2+ → trace.
#[must_use]
pub const fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `verbose` when set.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .with_writer(std::io::stderr)
        .try_init();

    debug!("rowfold started with verbosity level: {verbose}");
    trace!("full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
