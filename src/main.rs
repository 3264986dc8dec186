#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use kpiagg::cli::{Cli, run};
use kpiagg::config::KpiAggConfig;
use tracing::Level;
use tracing::event;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = KpiAggConfig::load().context("Failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(cli, config))
}

async fn async_main(cli: Cli, config: KpiAggConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    // Initialize Sentry if DSN is provided
    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    match run(cli, &config).await {
        Ok(()) => Ok(()),
        Err(err) => {
            event!(Level::ERROR, "kpiagg failed: {:?}", err);
            Err(err)
        }
    }
}
