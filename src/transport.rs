use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::error::UpstreamError;
use crate::resolver::ResolverConfig;

/// Media type of the JSON DoH dialect every configured upstream speaks.
pub const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";

/// Raw upstream reply, before normalization.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
	pub status: StatusCode,
	pub content_type: Option<String>,
	pub body: String,
}

/// Build the shared HTTP client used for every upstream.
///
/// No request timeout is set here: the dispatcher's batch deadline is the only one.
pub fn build_client() -> reqwest::Result<Client> {
	Client::builder()
		.use_rustls_tls()
		.pool_idle_timeout(Duration::from_secs(90))
		.pool_max_idle_per_host(4)
		.build()
}

/// Compose the GET url for one resolver.
///
/// `name` and `type` come first; an extra parameter with the same key
/// replaces the earlier value instead of repeating it.
pub fn build_request_url(config: &ResolverConfig, name: &str, record_type: &str) -> Url {
	let mut params: Vec<(&str, &str)> = vec![("name", name), ("type", record_type)];
	for (key, value) in &config.extra_params {
		match params.iter_mut().find(|entry| entry.0 == key.as_str()) {
			Some(existing) => existing.1 = value.as_str(),
			None => params.push((key.as_str(), value.as_str())),
		}
	}

	let mut url = config.base_url.clone();
	url.query_pairs_mut().extend_pairs(params);
	url
}

/// Send one DNS-JSON query and read the whole reply body.
///
/// Non-2xx statuses are returned as replies, not errors; the normalizer decides.
pub async fn send_query(
	client: &Client,
	config: &ResolverConfig,
	name: &str,
	record_type: &str,
) -> Result<UpstreamReply, UpstreamError> {
	let url = build_request_url(config, name, record_type);
	debug!(url = %url, "Sending DoH JSON query");

	let response = client
		.get(url)
		.header(ACCEPT, DNS_JSON_CONTENT_TYPE)
		.header(CACHE_CONTROL, "no-cache")
		.send()
		.await
		.map_err(UpstreamError::Request)?;

	let status = response.status();
	let content_type = response.headers()
		.get(CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.map(str::to_ascii_lowercase);
	let body = response.text().await.map_err(UpstreamError::Body)?;

	debug!(
		status = status.as_u16(),
		content_type = content_type.as_deref().unwrap_or(""),
		body_len = body.len(),
		"DoH response received"
	);

	Ok(UpstreamReply { status, content_type, body })
}
