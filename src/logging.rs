use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sends tracing output to `path`. The terminal belongs to the table while it
/// runs, so nothing is ever logged to stdout or stderr.
///
/// `RUST_LOG` overrides the default `info` level, e.g. `RUST_LOG=tabview=trace`.
pub fn init(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(io::Error::other)
}
