mod api;
mod cli;
mod dispatch;
mod dns;
mod error;
mod logging;
mod output;
mod query;
mod resolver;
mod transport;

#[cfg(test)]
mod mock_upstream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use crate::api::AppState;
use crate::cli::{Cli, Command, LookupArgs, ServeArgs, UpstreamArgs};
use crate::dispatch::Dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	logging::init_logging(&cli.log_level);

	match cli.command {
		Command::Serve(args) => serve(args).await,
		Command::Lookup(args) => lookup(args).await,
	}
}

fn build_dispatcher(args: &UpstreamArgs) -> Result<Dispatcher> {
	if args.deadline_ms == 0 {
		return Err(anyhow!("--deadline-ms must be greater than zero"));
	}
	let table = resolver::load_resolvers(args.resolver_file.as_deref())?;
	for (id, cfg) in table.iter() {
		info!(resolver = %id, base_url = %cfg.base_url, extra_params = cfg.extra_params.len(), "Resolver configured");
	}
	let client = transport::build_client()
		.map_err(|e| anyhow!("failed to build HTTP client: {}", e))?;
	Ok(Dispatcher::new(client, table, Duration::from_millis(args.deadline_ms)))
}

async fn serve(args: ServeArgs) -> Result<()> {
	let bind: SocketAddr = args.bind.parse()
		.map_err(|e| anyhow!("invalid bind address '{}': {}", args.bind, e))?;
	let dispatcher = build_dispatcher(&args.upstream)?;

	info!("Starting doh-fanout v{}", env!("CARGO_PKG_VERSION"));
	api::start_web_server(bind, AppState { dispatcher: Arc::new(dispatcher) }).await?;

	info!("Server shutdown complete");
	Ok(())
}

async fn lookup(args: LookupArgs) -> Result<()> {
	let dispatcher = build_dispatcher(&args.upstream)?;

	let (query, results) = dispatcher
		.lookup(Some(args.name.as_str()), Some(args.record_type.as_str()), Some(args.resolvers.as_str()))
		.await?;

	output::print_results_table(query.name(), query.record_type(), &results);

	if let Some(path) = &args.output {
		output::write_csv(path, &results)?;
	}

	Ok(())
}
