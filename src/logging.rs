// Logging setup shared by the CLI and the server

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. RUST_LOG wins over `default_level`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(default_level: &str) -> Result<(), TryInitError> {
    build_subscriber(default_level, std::io::stderr).try_init()
}

fn build_subscriber<W>(default_level: &str, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(writer))
}
