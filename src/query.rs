use std::collections::BTreeSet;

use crate::error::QueryError;
use crate::resolver::ResolverId;

pub const DEFAULT_RECORD_TYPE: &str = "A";
pub const DEFAULT_RESOLVERS: &str = "google,cloudflare,adguard,alidns";

/// A validated lookup: non-empty name, at least one known resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
	name: String,
	record_type: String,
	resolvers: BTreeSet<ResolverId>,
}

impl DnsQuery {
	/// Build a query from raw caller input.
	///
	/// The record type is forwarded upstream as-is; only the name and the
	/// resolver list are checked here.
	pub fn new(
		name: Option<&str>,
		record_type: Option<&str>,
		resolvers: Option<&str>,
	) -> Result<DnsQuery, QueryError> {
		let name = name.map(str::trim).unwrap_or_default();
		if name.is_empty() {
			return Err(QueryError::MissingName);
		}

		let record_type = match record_type.map(str::trim) {
			Some(t) if !t.is_empty() => t,
			_ => DEFAULT_RECORD_TYPE,
		};

		let resolvers = parse_resolver_list(resolvers.unwrap_or(DEFAULT_RESOLVERS));
		if resolvers.is_empty() {
			return Err(QueryError::NoValidResolvers);
		}

		Ok(DnsQuery {
			name: name.to_string(),
			record_type: record_type.to_string(),
			resolvers,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn record_type(&self) -> &str {
		&self.record_type
	}

	pub fn resolvers(&self) -> &BTreeSet<ResolverId> {
		&self.resolvers
	}
}

/// Split a comma-separated resolver list, dropping names that are not known.
pub fn parse_resolver_list(input: &str) -> BTreeSet<ResolverId> {
	input.split(',')
		.filter_map(ResolverId::parse)
		.collect()
}
