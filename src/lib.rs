//! AgriSight core: turns unreliable model text into trustworthy
//! agricultural records.
//!
//! - [`pipeline::stream`] splits streamed deltas into visible and thinking channels.
//! - [`pipeline::structuring`] recovers one JSON object from raw model text.
//! - [`pipeline::normalize`] fills every field of a typed record from defaults.
//! - [`market`] produces reproducible, mode-adjusted display figures.

pub mod config;
pub mod market;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// The filter comes from `AGRISIGHT_LOG`, then `RUST_LOG`, then
/// [`config::default_log_filter`]. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
    }
}
