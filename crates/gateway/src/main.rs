//! Gateway binary: config load, channel wiring, HTTP serve.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use alerting::{AlertDispatcher, AlertingConfig, ReportLink};
use gateway::{run_server, AppState};
use report_access::AccessTokenService;

/// Public base URL used when building signed report links.
const ENV_REPORT_BASE_URL: &str = "REPORT_BASE_URL";

/// Metrics alerting gateway
#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Metrics ingest, threshold alerting and secure report access")]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,

    /// Path to the alerting config JSON
    #[arg(long, default_value = "alerting-config.json")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "gateway=debug,alerting=debug,tower_http=debug"
    } else {
        "gateway=info,alerting=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match AlertingConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            warn!("could not load {}: {e}; using default configuration", cli.config);
            AlertingConfig::default()
        }
    };

    let tokens = match AccessTokenService::from_env() {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            warn!("{e}; signed report links disabled");
            None
        }
    };

    let mut alerts = AlertDispatcher::from_config(&config);
    if let Some(tokens) = &tokens {
        match std::env::var(ENV_REPORT_BASE_URL) {
            Ok(base_url) => {
                alerts = alerts.with_report_link(ReportLink {
                    tokens: Arc::clone(tokens),
                    base_url,
                });
            }
            Err(_) => warn!("REPORT_BASE_URL not set; alerts will not carry report links"),
        }
    }

    let state = Arc::new(AppState::new(alerts, tokens));
    info!(
        configured_channels = state.alerts.configured_channels(),
        "starting gateway"
    );

    run_server(state, &cli.addr).await
}
