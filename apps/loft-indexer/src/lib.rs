pub mod indexer;
pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use loft_service::LoftService;
use loft_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = loft_cli::VERSION,
	rename_all = "kebab",
	styles = loft_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = loft_config::load(&args.config)?;

	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let service = LoftService::new(config, db, qdrant);

	tracing::info!("Indexing worker started.");

	worker::run_worker(&service).await
}

fn init_tracing(config: &loft_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}
