use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dns::{normalize, ResolverOutcome, ResultSet};
use crate::error::{QueryError, UpstreamError};
use crate::query::DnsQuery;
use crate::resolver::{ResolverId, ResolverTable};
use crate::transport::send_query;

/// Budget shared by every upstream request of one lookup.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(12);

/// One cancellation signal per lookup, fired by a single timer.
///
/// Dropping the deadline releases the timer whether or not it fired.
struct Deadline {
	token: CancellationToken,
	timer: JoinHandle<()>,
}

impl Deadline {
	fn start(budget: Duration) -> Self {
		let token = CancellationToken::new();
		let timer = tokio::spawn({
			let token = token.clone();
			async move {
				tokio::time::sleep(budget).await;
				token.cancel();
			}
		});
		Self { token, timer }
	}

	fn token(&self) -> CancellationToken {
		self.token.clone()
	}

	fn fired(&self) -> bool {
		self.token.is_cancelled()
	}
}

impl Drop for Deadline {
	fn drop(&mut self) {
		self.timer.abort();
	}
}

/// Fans a lookup out to the configured DoH resolvers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
	client: Client,
	table: Arc<ResolverTable>,
	deadline: Duration,
}

impl Dispatcher {
	pub fn new(client: Client, table: ResolverTable, deadline: Duration) -> Self {
		Self { client, table: Arc::new(table), deadline }
	}

	pub fn deadline(&self) -> Duration {
		self.deadline
	}

	/// Validate raw caller input and resolve it.
	///
	/// Invalid input is rejected before any upstream is contacted.
	pub async fn lookup(
		&self,
		name: Option<&str>,
		record_type: Option<&str>,
		resolvers: Option<&str>,
	) -> Result<(DnsQuery, ResultSet), QueryError> {
		let query = DnsQuery::new(name, record_type, resolvers)?;
		let results = self.resolve(&query).await;
		Ok((query, results))
	}

	/// Query every resolver of `query` concurrently under one shared deadline.
	///
	/// Returns once every resolver has settled. Each resolver gets exactly one
	/// outcome; failures and deadline expiry are recorded per resolver.
	pub async fn resolve(&self, query: &DnsQuery) -> ResultSet {
		let started = Instant::now();
		let deadline = Deadline::start(self.deadline);

		let lookups = query.resolvers().iter().map(|&id| {
			let cancelled = deadline.token();
			async move {
				let result = tokio::select! {
					biased;
					result = self.query_resolver(id, query) => result,
					_ = cancelled.cancelled() => Err(UpstreamError::Deadline(self.deadline)),
				};
				let outcome = match result {
					Ok(outcome) => outcome,
					Err(e) => ResolverOutcome::failure(e.to_string()),
				};
				if let ResolverOutcome::Failure { error } = &outcome {
					warn!(resolver = %id, name = query.name(), error = %error, "Resolver lookup failed");
				}
				(id, outcome)
			}
		});
		let results: ResultSet = join_all(lookups).await.into_iter().collect();

		let succeeded = results.values().filter(|o| o.is_success()).count();
		info!(
			name = query.name(),
			record_type = query.record_type(),
			resolvers = results.len(),
			succeeded,
			deadline_hit = deadline.fired(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"DNS fan-out lookup completed"
		);
		results
	}

	async fn query_resolver(
		&self,
		id: ResolverId,
		query: &DnsQuery,
	) -> Result<ResolverOutcome, UpstreamError> {
		let started = Instant::now();
		let reply = send_query(&self.client, self.table.get(id), query.name(), query.record_type()).await?;
		debug!(
			resolver = %id,
			status = reply.status.as_u16(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Resolver replied"
		);
		Ok(normalize(&reply.body, reply.status, reply.content_type.as_deref()))
	}
}
