use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::DashboardError;

/// Route all tracing output into `path`.
///
/// The terminal is owned by the dashboard, so nothing is written to stdout.
/// The level defaults to `info` and can be changed with `RUST_LOG`.
pub fn init_logging(path: &Path) -> Result<(), DashboardError> {
    let file = File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DashboardError::LoggingError(e.to_string()))
}
