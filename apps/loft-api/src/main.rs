use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = loft_api::Args::parse();
	loft_api::run(args).await
}
