use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use profilegate::Config;
use profilegate::provider::ClerkProvider;
use tracing::info;

/// Profile gateway in front of a Clerk instance.
#[derive(Parser, Debug)]
#[command(name = "profilegate")]
#[command(version, about, long_about = None)]
struct Args {
	/// Path to a YAML configuration file
	#[arg(short, long, env = "PROFILEGATE_CONFIG")]
	config: Option<PathBuf>,

	/// Listen address, overriding configuration
	#[arg(short, long)]
	listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
	if let Some(listen) = args.listen {
		config.listen = listen;
	}
	profilegate::telemetry::init(&config.logging)?;

	let provider = ClerkProvider::from_config(&config.provider).context("configuring identity provider")?;
	info!(api_url = %config.provider.api_url, "identity provider configured");

	profilegate::app::run(config, Arc::new(provider)).await
}
