use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::dns::ResultSet;
use crate::error::QueryError;

#[derive(Clone)]
pub struct AppState {
	pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DnsLookupParams {
	pub name: Option<String>,
	pub record_type: Option<String>,
	pub resolvers: Option<String>,
}

impl DnsLookupParams {
	/// Pick the lookup parameters out of raw query pairs.
	///
	/// A repeated key keeps its first value; unknown keys are ignored.
	pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
		let mut params = Self::default();
		for (key, value) in pairs {
			let slot = match key.as_str() {
				"name" => &mut params.name,
				"type" => &mut params.record_type,
				"resolvers" => &mut params.resolvers,
				_ => continue,
			};
			if slot.is_none() {
				*slot = Some(value);
			}
		}
		params
	}
}

#[derive(Debug, Serialize)]
pub struct DnsLookupResponse {
	pub name: String,
	#[serde(rename = "type")]
	pub record_type: String,
	pub results: ResultSet,
}

#[derive(Debug)]
pub enum ApiError {
	Query(QueryError),
	BadRequest(String),
}

impl From<QueryError> for ApiError {
	fn from(err: QueryError) -> Self {
		ApiError::Query(err)
	}
}

impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		ApiError::BadRequest(rejection.body_text())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			ApiError::Query(err) => (StatusCode::BAD_REQUEST, err.to_string()),
			ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
		};
		(status, Json(json!({ "error": message }))).into_response()
	}
}

pub fn create_api_routes(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health_check))
		.route("/dns", get(lookup_dns))
		.with_state(state)
}

pub fn create_app(state: AppState) -> Router {
	Router::new()
		.nest("/api", create_api_routes(state))
		.layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(bind_addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
	info!(
		bind_address = %bind_addr,
		lookup_url = format!("http://{}/api/dns", bind_addr),
		deadline_ms = state.dispatcher.deadline().as_millis() as u64,
		"Starting web server"
	);

	let app = create_app(state);
	let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if tokio::signal::ctrl_c().await.is_ok() {
		info!("Shutdown signal received");
	}
}

async fn health_check() -> Json<serde_json::Value> {
	Json(json!({ "status": "ok" }))
}

async fn lookup_dns(
	State(state): State<AppState>,
	pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<DnsLookupResponse>, ApiError> {
	let Query(pairs) = pairs.inspect_err(|e| debug!(error = %e, "Rejected lookup query string"))?;
	let params = DnsLookupParams::from_pairs(pairs);
	let (query, results) = state.dispatcher
		.lookup(
			params.name.as_deref(),
			params.record_type.as_deref(),
			params.resolvers.as_deref(),
		)
		.await?;

	Ok(Json(DnsLookupResponse {
		name: query.name().to_string(),
		record_type: query.record_type().to_string(),
		results,
	}))
}
