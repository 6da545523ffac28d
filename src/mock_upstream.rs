//! In-process DNS-JSON upstream for tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

use crate::resolver::ResolverConfig;

#[derive(Clone)]
pub enum MockBehaviour {
	Respond { status: u16, content_type: &'static str, body: String },
	Hang,
}

impl MockBehaviour {
	pub fn json(body: &str) -> Self {
		MockBehaviour::Respond {
			status: 200,
			content_type: "application/dns-json",
			body: body.to_string(),
		}
	}

	pub fn a_record(name: &str, addr: &str) -> Self {
		MockBehaviour::json(&format!(
			r#"{{"Status":0,"TC":false,"RD":true,"RA":true,"AD":false,"CD":false,
			"Question":[{{"name":"{name}.","type":1}}],
			"Answer":[{{"name":"{name}.","type":1,"TTL":300,"data":"{addr}"}}]}}"#
		))
	}
}

#[derive(Clone)]
struct MockState {
	behaviour: MockBehaviour,
	hits: Arc<AtomicUsize>,
	last_query: Arc<Mutex<Option<String>>>,
	last_accept: Arc<Mutex<Option<String>>>,
	last_cache_control: Arc<Mutex<Option<String>>>,
}

pub struct MockUpstream {
	addr: SocketAddr,
	state: MockState,
}

impl MockUpstream {
	pub async fn start(behaviour: MockBehaviour) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let state = MockState {
			behaviour,
			hits: Arc::new(AtomicUsize::new(0)),
			last_query: Arc::new(Mutex::new(None)),
			last_accept: Arc::new(Mutex::new(None)),
			last_cache_control: Arc::new(Mutex::new(None)),
		};
		let app = Router::new().fallback(handle).with_state(state.clone());
		tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});
		Self { addr, state }
	}

	pub fn config(&self) -> ResolverConfig {
		ResolverConfig::parse(&format!("http://{}/resolve", self.addr)).unwrap()
	}

	pub fn hits(&self) -> usize {
		self.state.hits.load(Ordering::SeqCst)
	}

	pub fn last_query(&self) -> Option<String> {
		self.state.last_query.lock().unwrap().clone()
	}

	pub fn last_accept(&self) -> Option<String> {
		self.state.last_accept.lock().unwrap().clone()
	}

	pub fn last_cache_control(&self) -> Option<String> {
		self.state.last_cache_control.lock().unwrap().clone()
	}
}

/// A base url nothing is listening on.
pub async fn closed_port_config() -> ResolverConfig {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);
	ResolverConfig::parse(&format!("http://{}/resolve", addr)).unwrap()
}

/// Client for talking to loopback mocks, ignoring any proxy in the environment.
pub fn test_client() -> reqwest::Client {
	reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn handle(State(state): State<MockState>, uri: Uri, headers: HeaderMap) -> Response {
	state.hits.fetch_add(1, Ordering::SeqCst);
	*state.last_query.lock().unwrap() = uri.query().map(String::from);
	*state.last_accept.lock().unwrap() = header_text(&headers, header::ACCEPT);
	*state.last_cache_control.lock().unwrap() = header_text(&headers, header::CACHE_CONTROL);

	match state.behaviour {
		MockBehaviour::Respond { status, content_type, body } => (
			StatusCode::from_u16(status).unwrap(),
			[(header::CONTENT_TYPE, content_type)],
			body,
		).into_response(),
		MockBehaviour::Hang => {
			tokio::time::sleep(Duration::from_secs(3600)).await;
			StatusCode::GATEWAY_TIMEOUT.into_response()
		}
	}
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
	headers.get(name).and_then(|v| v.to_str().ok()).map(String::from)
}
