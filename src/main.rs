use anyhow::Context;
use clap::Parser;
use pin_analyzer::{
    cli::{self, Cli},
    config::Config,
    logging::init_tracing,
};
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::resolve(Some(path))
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::resolve(None).context("failed to load default config")?,
    };

    let logging_guard = init_tracing(&config.logging, cli.command.name())?;
    let run_span = logging_guard.run_span().clone();
    run_span.in_scope(|| config.apply_env_overrides(|key| std::env::var(key).ok()));

    cli::run(cli, config).instrument(run_span).await
}
