//! Main binary for the tensorserve daemon (tensorserved)

use clap::{Parser, Subcommand};
use serve_core::{HealthState, ServerConfig};
use serve_http::{Dispatcher, HttpServer, Result, ServerError};
use serve_metrics::MetricsAggregator;
use serve_model::IrisClassifier;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tensorserved")]
#[command(about = "Single-model tensor inference server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve,
    /// Print the default configuration as YAML
    Config,
    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    init_tracing(&cli.log_level);

    match cli.command.take() {
        Some(Commands::Config) => print_default_config(),
        Some(Commands::Validate { config }) => validate_config(config),
        Some(Commands::Serve) | None => serve(cli).await,
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_default_config() -> Result<()> {
    let yaml = serde_yaml::to_string(&ServerConfig::default())
        .map_err(|e| ServerError::Configuration(e.to_string()))?;
    println!("{}", yaml);
    Ok(())
}

fn validate_config(path: PathBuf) -> Result<()> {
    let config = ServerConfig::load(Some(path.clone()))?;
    config.validate()?;
    println!("Configuration is valid: {}", path.display());
    Ok(())
}

async fn serve(cli: Cli) -> Result<()> {
    let mut config = ServerConfig::load(cli.config)?;
    if let Some(listen) = cli.listen {
        config.http_addr = listen;
    }
    config.validate()?;

    let runtime = Arc::new(IrisClassifier::new());
    let health = Arc::new(HealthState::new(&config.degraded));
    let metrics = MetricsAggregator::new(&config.metrics.latency_buckets)?;
    let dispatcher = Arc::new(Dispatcher::new(runtime, health, metrics));

    info!(
        "Starting tensorserved with model '{}'",
        dispatcher.schema().name
    );

    // The listener comes up immediately; readiness gates traffic while the
    // model loads in the background.
    let loader = dispatcher.clone();
    let load_timeout = Duration::from_secs(config.load_timeout_seconds);
    let warm_up = config.warm_up;
    tokio::spawn(async move {
        loader.load_model(load_timeout, warm_up).await;
    });

    HttpServer::new(config.http_addr, dispatcher).serve().await
}
