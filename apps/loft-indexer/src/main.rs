use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = loft_indexer::Args::parse();
	loft_indexer::run(args).await
}
