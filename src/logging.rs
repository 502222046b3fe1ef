//! Tracing subscriber setup for the standalone binary.
//!
//! `RUST_LOG` takes precedence over the configured level:
//! ```bash
//! RUST_LOG=watch_node_modules=debug watch-node-modules watch left-pad
//! ```

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Level used when neither `RUST_LOG` nor the config file sets one.
pub const DEFAULT_LEVEL: &str = "info";

/// Install a stderr fmt layer filtered by `RUST_LOG` or `default_filter`.
///
/// Only the first call takes effect.
pub fn init(default_filter: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(default_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}
