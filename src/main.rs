use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let settings_path = std::env::var("CODECAMP_SETTINGS").unwrap_or_else(|_| codecamp::config::DEFAULT_SETTINGS_FILE.to_string());
    info!(
        target: "codecamp",
        "Code Camp API starting: RUST_LOG='{}', settings='{}'",
        rust_log, settings_path
    );

    codecamp::server::run().await
}
