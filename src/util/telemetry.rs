use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

/// Installs the fmt subscriber for binaries embedding this crate. Calling it
/// a second time returns an error from `try_init` rather than panicking.
pub fn init() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("plus_fan=debug,info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .try_init()?;

    Ok(())
}
