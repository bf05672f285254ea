use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_LOG_FILTER;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Also forwards `log` records, which is how
/// the vision crate reports model loading.
pub fn init() {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    });
}
