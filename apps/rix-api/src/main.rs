use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = rix_api::Args::parse();

	rix_api::run(args).await
}
