use anyhow::Result;
use clap::Parser;
use querygrade_core::config::load_config;
use querygrade_core::Grader;
use querygrade_server::config;
use querygrade_server::server::Server;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "QUERYGRADE_CONFIG", default_value = "querygrade.yaml")]
    config: PathBuf,

    /// Treat unknown config keys as errors
    #[arg(long)]
    strict: bool,
}

use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::ServerConfig::from_env();

    init_logging(&cfg.log_level);

    let service = load_config(&args.config, args.strict)?;
    let grader = Grader::from_config(&service)?;

    tracing::info!(
        event = "server_start",
        config_file = %args.config.display(),
        database = %service.database,
        exercises = grader.catalog().len(),
        config = ?cfg
    );

    Server::run(grader, cfg).await
}
