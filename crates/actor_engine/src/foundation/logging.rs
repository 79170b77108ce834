//! Logging setup
//!
//! The engine logs through the `log` facade. Lookup misses (missing component,
//! unknown actor) are reported at `warn`, flush activity at `debug`.

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level, still overridable by `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Parse a level name such as `"debug"`, falling back to `Info`
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or_else(|_| {
        warn!("Unknown log level '{}', using info", name);
        LevelFilter::Info
    })
}
