//! Logging setup shared by the pipeline binaries.
//!
//! Logs go to stdout through a single fmt layer. `RUST_LOG` refines the
//! filter; the default level is INFO.

use tracing::Level;
use tracing_subscriber::prelude::*;

pub fn init_logging() {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();
}
