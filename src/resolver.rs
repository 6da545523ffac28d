use std::fmt;

use anyhow::{anyhow, Result};
use reqwest::Url;
use serde::Serialize;

/// Upstream DoH services the dispatcher knows how to talk to.
///
/// Declaration order is the order results are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverId {
	Google,
	Cloudflare,
	Adguard,
	Alidns,
}

impl ResolverId {
	pub const ALL: [ResolverId; 4] = [
		ResolverId::Google,
		ResolverId::Cloudflare,
		ResolverId::Adguard,
		ResolverId::Alidns,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			ResolverId::Google => "google",
			ResolverId::Cloudflare => "cloudflare",
			ResolverId::Adguard => "adguard",
			ResolverId::Alidns => "alidns",
		}
	}

	fn index(self) -> usize {
		self as usize
	}

	/// Match a user-supplied resolver name, ignoring case and surrounding whitespace.
	pub fn parse(input: &str) -> Option<ResolverId> {
		let wanted = input.trim().to_ascii_lowercase();
		ResolverId::ALL.into_iter().find(|id| id.as_str() == wanted)
	}
}

impl fmt::Display for ResolverId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Request shape for a single upstream: where to send it and which
/// query parameters it needs on top of `name` and `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
	pub base_url: Url,
	pub extra_params: Vec<(String, String)>,
}

impl ResolverConfig {
	pub fn new(base_url: Url) -> Self {
		Self { base_url, extra_params: Vec::new() }
	}

	/// Parse and check a base url. Only `http` and `https` are accepted.
	pub fn parse(base_url: &str) -> Result<Self> {
		let url = Url::parse(base_url)
			.map_err(|e| anyhow!("invalid base url '{}': {}", base_url, e))?;
		if url.scheme() != "https" && url.scheme() != "http" {
			return Err(anyhow!("base url must use http or https, got '{}'", url.scheme()));
		}
		Ok(Self::new(url))
	}

	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.push((key.into(), value.into()));
		self
	}
}

/// Read-only lookup from resolver id to its request shape, built once at startup.
///
/// Holds exactly one entry per [`ResolverId`], so a lookup cannot miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverTable {
	entries: [ResolverConfig; 4],
}

impl ResolverTable {
	pub fn get(&self, id: ResolverId) -> &ResolverConfig {
		&self.entries[id.index()]
	}

	pub fn with_resolver(mut self, id: ResolverId, config: ResolverConfig) -> Self {
		self.entries[id.index()] = config;
		self
	}

	pub fn iter(&self) -> impl Iterator<Item = (ResolverId, &ResolverConfig)> {
		ResolverId::ALL.into_iter().zip(self.entries.iter())
	}
}

/// Return the well-known public DNS-JSON endpoints.
pub fn default_resolvers() -> Result<ResolverTable> {
	Ok(ResolverTable {
		entries: [
			ResolverConfig::parse("https://dns.google/resolve")?,
			ResolverConfig::parse("https://cloudflare-dns.com/dns-query")?
				.with_param("ct", "application/dns-json"),
			ResolverConfig::parse("https://dns.adguard-dns.com/resolve")?,
			ResolverConfig::parse("https://dns.alidns.com/resolve")?,
		],
	})
}

/// Parse one resolver file line into an id and its request shape.
///
/// Format: `<id> <base_url> [key=value ...]`, e.g.
///   "cloudflare https://cloudflare-dns.com/dns-query ct=application/dns-json"
pub fn parse_resolver(input: &str) -> Result<(ResolverId, ResolverConfig)> {
	let mut parts = input.split_whitespace();
	let id_str = parts.next()
		.ok_or_else(|| anyhow!("empty resolver entry"))?;
	let id = ResolverId::parse(id_str)
		.ok_or_else(|| anyhow!("unknown resolver '{}'", id_str))?;

	let base_url = parts.next()
		.ok_or_else(|| anyhow!("resolver '{}' is missing a base url", id))?;
	let mut config = ResolverConfig::parse(base_url)
		.map_err(|e| anyhow!("resolver '{}': {}", id, e))?;
	for param in parts {
		let (key, value) = param.split_once('=')
			.ok_or_else(|| anyhow!("malformed parameter '{}' for resolver '{}', expected key=value", param, id))?;
		if key.is_empty() {
			return Err(anyhow!("empty parameter name for resolver '{}'", id));
		}
		config = config.with_param(key, value);
	}
	Ok((id, config))
}

/// Read resolver overrides from a file, one per line, on top of the defaults.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_resolver_file(path: &str) -> Result<ResolverTable> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read resolver file '{}': {}", path, e))?;
	let mut table = default_resolvers()?;
	for (lineno, line) in content.lines().enumerate() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		let (id, config) = parse_resolver(trimmed)
			.map_err(|e| anyhow!("{}:{}: {}", path, lineno + 1, e))?;
		table = table.with_resolver(id, config);
	}
	Ok(table)
}

/// Load the resolver table from an optional override file.
pub fn load_resolvers(path: Option<&str>) -> Result<ResolverTable> {
	match path {
		Some(path) => read_resolver_file(path),
		None => default_resolvers(),
	}
}
