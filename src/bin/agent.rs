use std::time::Duration;

use clap::Parser;
use hostwatch::{
    config::{AgentConfig, read_agent_config_file},
    sampler,
};
use reqwest::Client;
use tracing::{debug, error, info, instrument, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Agent config file
    #[arg(short, default_value = "client-config.json")]
    config: String,
}

fn init() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(true),
        )
        .with(filter::LevelFilter::DEBUG)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_agent_config_file(&args.config)?;
    info!(
        "reporting {} to {} every {}s",
        config.host_name, config.report_url, config.report_interval
    );

    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    loop {
        report(&client, &config).await;
        tokio::time::sleep(Duration::from_secs(config.report_interval)).await;
    }
}

#[instrument(skip_all)]
async fn report(client: &Client, config: &AgentConfig) {
    let host_name = config.host_name.clone();
    let snapshot = match tokio::task::spawn_blocking(move || sampler::sample(&host_name)).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("sampling failed: {e}");
            return;
        }
    };

    let response = match client.post(&config.report_url).json(&snapshot).send().await {
        Ok(response) => response,
        Err(e) => {
            error!("{}: error during request: {e}", config.report_url);
            return;
        }
    };

    let status = response.status();
    if status.is_success() {
        debug!("{}: report accepted", config.report_url);
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!("{}: report rejected with {status}: {body}", config.report_url);
    }
}
