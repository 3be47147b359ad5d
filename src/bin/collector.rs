use clap::Parser;
use hostwatch::{
    alerts::build_sink,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    ingest::Ingestor,
    storage::{self, StorageBackend},
    util::listen_addr,
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults are used when omitted)
    #[arg(short)]
    file: Option<String>,
}

fn log_filter() -> filter::Targets {
    filter::Targets::new().with_targets(vec![
        ("hostwatch", LevelFilter::TRACE),
        ("hostwatch_collector", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ])
}

fn init() {
    dotenv::dotenv().ok();

    let filter = log_filter();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let storage = storage::open(&config.storage).await?;
    info!("{}", storage.get_stats().await?);

    let sink = build_sink(config.alert.as_ref(), config.dispatch_timeout())?;
    let ingestor = Ingestor::from_config(&config, storage.clone(), sink);

    let api_config = ApiConfig {
        bind_addr: listen_addr(config.listen),
        report_path: config.report_path.clone(),
    };
    spawn_api_server(api_config, ApiState::new(ingestor)).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    if let Err(e) = storage.close().await {
        error!("failed to close storage: {e}");
    }

    Ok(())
}
