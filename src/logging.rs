//! Tracing subscriber installation.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::LogConfig;

static TRACING_INSTALLED: Once = Once::new();

/// Installs a formatting subscriber as the global default (idempotent).
///
/// `RUST_LOG` takes precedence over [`LogConfig::filter`]. Returns `true` if this
/// call installed the subscriber; `false` if one was already installed, by this
/// function or by the host application.
pub fn install(config: &LogConfig) -> bool {
    let mut installed = false;
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.filter));
        installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_ansi(config.ansi))
            .try_init()
            .is_ok();
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_a_no_op() {
        let config = LogConfig::default();
        install(&config);
        assert!(!install(&config));
    }
}
