use clap::{Args, Parser, Subcommand};

use crate::dispatch::DEFAULT_DEADLINE;
use crate::query::{DEFAULT_RECORD_TYPE, DEFAULT_RESOLVERS};

/// DNS-over-HTTPS fan-out resolver
#[derive(Parser, Debug)]
#[command(name = "doh-fanout")]
#[command(about = "Query several DNS-over-HTTPS resolvers at once and compare their answers")]
pub struct Cli {
	/// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
	#[arg(long = "log-level", global = true, default_value = "info")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Serve the lookup API over HTTP
	Serve(ServeArgs),
	/// Run a single lookup and print every resolver's answer
	Lookup(LookupArgs),
}

/// Options shared by every command that talks to upstreams
#[derive(Args, Debug)]
pub struct UpstreamArgs {
	/// Deadline in milliseconds shared by all upstream requests of one lookup
	#[arg(long = "deadline-ms", default_value_t = DEFAULT_DEADLINE.as_millis() as u64)]
	pub deadline_ms: u64,

	/// File overriding resolver endpoints (`<id> <base_url> [key=value ...]` per line)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
	/// Address to listen on
	#[arg(short = 'b', long = "bind", default_value = "127.0.0.1:3000")]
	pub bind: String,

	#[command(flatten)]
	pub upstream: UpstreamArgs,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
	/// Domain name to resolve
	pub name: String,

	/// Record type, forwarded to upstreams as given
	#[arg(short = 't', long = "type", default_value = DEFAULT_RECORD_TYPE)]
	pub record_type: String,

	/// Comma-separated resolver ids
	#[arg(short = 'r', long = "resolvers", default_value = DEFAULT_RESOLVERS)]
	pub resolvers: String,

	/// Output CSV file path
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	#[command(flatten)]
	pub upstream: UpstreamArgs,
}
