//! Log subscriber setup for binaries and tests.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DegreeCacheError, Result};

/// Installs a formatting subscriber filtered by `level`, an `EnvFilter` directive such as
/// `info` or `sombra_relcount=debug`. `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| DegreeCacheError::InvalidArgument(format!("Invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| DegreeCacheError::InvalidArgument("Logging already initialized".into()))
}
