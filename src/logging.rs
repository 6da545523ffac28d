use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.with_level(true)
		.with_writer(std::io::stderr)
		.init();

	info!("Logging initialized at level: {}", level);
}
