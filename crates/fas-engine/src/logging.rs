//! Log output for the binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Calling this
/// more than once is harmless; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
