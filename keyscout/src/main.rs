mod config;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use estimator::config::Credentials;
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const METRICS_PREFIX: &str = "keyscout";

#[derive(thiserror::Error, Debug)]
enum KeyscoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] keyword_api::config::ValidationError),

    #[error(transparent)]
    Credentials(#[from] estimator::config::ValidationError),

    #[error("invalid log level `{0}`")]
    InvalidLogLevel(String),

    #[error("invalid sentry DSN")]
    InvalidSentryDsn,

    #[error("could not set up statsd exporter: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),

    #[error("a metrics recorder is already installed")]
    RecorderInstalled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    KeywordApi(#[from] keyword_api::KeywordApiError),
}

#[derive(Parser)]
#[command(name = "keyscout", about = "Keyword search volume research backend")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the keyword API and admin listeners
    Serve(ConfigArgs),
    /// Load and validate the config, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_path: PathBuf,
}

fn main() -> Result<(), KeyscoutError> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Serve(args) => serve(args),
        CliCommand::CheckConfig(args) => {
            let config = Config::from_file(&args.config_path)?;
            init_logging(&config.logging())?;
            load_credentials(&config)?;
            tracing::info!(path = %args.config_path.display(), "Config is valid");
            Ok(())
        }
    }
}

fn serve(args: ConfigArgs) -> Result<(), KeyscoutError> {
    let config = Config::from_file(&args.config_path)?;
    let logging = config.logging();

    // Must outlive the runtime so buffered events are flushed on exit
    let _sentry = logging
        .sentry_dsn
        .as_deref()
        .map(init_sentry)
        .transpose()?;
    init_logging(&logging)?;

    if let Some(metrics) = &config.common.metrics {
        init_statsd_recorder(metrics)?;
    }
    shared::metrics_defs::describe_all(estimator::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(keyword_api::metrics_defs::ALL_METRICS);

    let credentials = load_credentials(&config)?;

    tracing::info!(path = %args.config_path.display(), "Starting keyscout");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(keyword_api::run(config.keyword_api, credentials))?;
    Ok(())
}

/// Validates the config and resolves upstream credentials, environment first.
fn load_credentials(config: &Config) -> Result<Credentials, KeyscoutError> {
    config.keyword_api.validate()?;
    let credentials = config
        .keyword_api
        .estimator
        .naver
        .credentials(|name| std::env::var(name).ok())?;
    Ok(credentials)
}

fn init_sentry(dsn: &str) -> Result<sentry::ClientInitGuard, KeyscoutError> {
    let dsn: sentry::types::Dsn = dsn.parse().map_err(|_| KeyscoutError::InvalidSentryDsn)?;
    Ok(sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    }))
}

fn init_logging(logging: &LoggingConfig) -> Result<(), KeyscoutError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .map_err(|_| KeyscoutError::InvalidLogLevel(logging.level.clone()))?,
    };

    let sentry_layer = logging
        .sentry_dsn
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
    Ok(())
}

fn init_statsd_recorder(metrics: &MetricsConfig) -> Result<(), KeyscoutError> {
    let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| KeyscoutError::RecorderInstalled)?;
    tracing::info!(
        host = %metrics.statsd_host,
        port = metrics.statsd_port,
        "Exporting metrics to statsd"
    );
    Ok(())
}
