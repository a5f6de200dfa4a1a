//! Logging setup. Everything goes to stderr so report JSON on stdout stays
//! machine-readable.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins when set; otherwise
/// `verbosity` picks info / debug / trace for this crate.
pub fn init(verbosity: u8) {
    let default = match verbosity {
        0 => "topo_layout=info",
        1 => "topo_layout=debug",
        _ => "topo_layout=trace",
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
