//! field-safety-monitor daemon
//!
//! Re-reads a site conditions file every cycle, evaluates risk, and serves
//! the host API over HTTP. Subcommands run a single cycle and exit.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use field_safety_monitor::api::create_router;
use field_safety_monitor::config::Config;
use field_safety_monitor::monitor::cli::{execute_command, MonitorCommands};
use field_safety_monitor::monitor::{MonitorSources, SafetyMonitor};
use field_safety_monitor::sources::ConditionsFile;

#[derive(Parser)]
#[command(name = "field-safety-monitor")]
#[command(about = "Field safety risk monitoring engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "field-safety.toml")]
    config: PathBuf,

    /// Site ID (overrides config file)
    #[arg(long, env = "FIELD_SAFETY_SITE_ID")]
    site_id: Option<String>,

    /// Site conditions JSON file (overrides config file)
    #[arg(long, env = "FIELD_SAFETY_CONDITIONS")]
    conditions: Option<PathBuf>,

    /// HTTP port (overrides config file)
    #[arg(long)]
    http_port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<MonitorCommands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("field_safety_monitor=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(site_id) = cli.site_id {
        config.monitor.site_id = site_id;
    }
    if let Some(conditions) = cli.conditions {
        config.site.conditions_file = conditions;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    let source = Arc::new(ConditionsFile::new(config.site.conditions_file.clone()));
    let sources = MonitorSources::from_shared(source).with_geo(Arc::new(config.geo.reference()));
    let monitor = SafetyMonitor::builder(config.clone(), sources).build();

    match cli.command.unwrap_or(MonitorCommands::Run) {
        MonitorCommands::Run => run(monitor, &config).await,
        command => match execute_command(&monitor, command).await {
            Ok(output) => {
                println!("{}", output);
                Ok(())
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

async fn run(monitor: SafetyMonitor, config: &Config) -> anyhow::Result<()> {
    info!(
        site_id = %config.monitor.site_id,
        conditions = %config.site.conditions_file.display(),
        "Starting field-safety-monitor"
    );

    monitor.start().await?;

    let result = if config.api.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        info!("API listening on http://{}", addr);

        axum::serve(listener, create_router(monitor.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(anyhow::Error::from)
    } else {
        info!("API disabled");
        shutdown_signal().await;
        Ok(())
    };

    monitor.stop().await;
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
