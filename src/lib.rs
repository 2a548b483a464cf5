//! Swiss home-purchase equity calculator: checks projected savings against the
//! 20% total / 10% hard equity rules and sizes the monthly savings that close
//! the gap by a target month.

pub mod api;
pub mod core;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global `fmt` subscriber. `RUST_LOG` adds to the default
/// `eigenmittel=info` directive.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "eigenmittel=info".parse() {
            filter = filter.add_directive(directive);
        }

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
