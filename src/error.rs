use std::time::Duration;

use thiserror::Error;

/// A lookup request that cannot be dispatched. Raised before any upstream is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
	#[error("Missing parameter: name")]
	MissingName,

	#[error("No valid resolvers specified")]
	NoValidResolvers,
}

/// Failure talking to one upstream resolver. Rendered into that resolver's outcome text.
#[derive(Debug, Error)]
pub enum UpstreamError {
	#[error("request failed: {0}")]
	Request(#[source] reqwest::Error),

	#[error("failed to read response body: {0}")]
	Body(#[source] reqwest::Error),

	#[error("request aborted: deadline of {0:?} exceeded")]
	Deadline(Duration),
}
