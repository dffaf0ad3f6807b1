//! Console logging for the executables
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// default level, which is `debug` if `debug` is set and `info` otherwise.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call, as in tests, keeps the first subscriber
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_writer(std::io::stderr)
        .try_init();
}
