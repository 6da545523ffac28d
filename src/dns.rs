use std::collections::BTreeMap;
use std::str::FromStr;

use hickory_proto::rr::RecordType;
use reqwest::StatusCode;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::resolver::ResolverId;

/// Longest slice of an unusable body kept in a failure message.
const ERROR_SNIPPET_CHARS: usize = 200;

/// Typed view of one DNS-JSON record.
///
/// Built leniently from the upstream entry: a missing, null or mistyped
/// field falls back to an empty string or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
	pub name: String,
	pub rr_type: u16,
	pub ttl: u32,
	pub data: String,
}

impl ResourceRecord {
	fn from_value(value: &Value) -> Option<Self> {
		let entry = value.as_object()?;
		Some(ResourceRecord {
			name: text_field(entry.get("name")),
			rr_type: type_field(entry.get("type")),
			ttl: entry.get("TTL").or_else(|| entry.get("ttl"))
				.and_then(Value::as_u64)
				.and_then(|ttl| u32::try_from(ttl).ok())
				.unwrap_or(0),
			data: text_field(entry.get("data")),
		})
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionEntry {
	pub name: String,
	pub rr_type: u16,
}

impl QuestionEntry {
	fn from_value(value: &Value) -> Option<Self> {
		let entry = value.as_object()?;
		Some(QuestionEntry {
			name: text_field(entry.get("name")),
			rr_type: type_field(entry.get("type")),
		})
	}
}

fn text_field(value: Option<&Value>) -> String {
	match value {
		Some(Value::String(s)) => s.clone(),
		None | Some(Value::Null) => String::new(),
		Some(other) => other.to_string(),
	}
}

/// Numeric type code, also accepting a decimal string or a mnemonic like `"AAAA"`.
fn type_field(value: Option<&Value>) -> u16 {
	match value {
		Some(Value::Number(n)) => n.as_u64()
			.and_then(|code| u16::try_from(code).ok())
			.unwrap_or(0),
		Some(Value::String(s)) => s.parse::<u16>().ok()
			.or_else(|| RecordType::from_str(s).ok().map(u16::from))
			.unwrap_or(0),
		_ => 0,
	}
}

/// An upstream DNS-JSON body, kept exactly as the upstream sent it.
///
/// Serializes verbatim; the section accessors give typed views on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DnsJsonResponse {
	body: Value,
}

impl Default for DnsJsonResponse {
	fn default() -> Self {
		Self { body: Value::Object(Map::new()) }
	}
}

impl DnsJsonResponse {
	pub fn new(body: Value) -> Self {
		Self { body }
	}

	pub fn body(&self) -> &Value {
		&self.body
	}

	/// `Status`, else `StatusCode`, else 0.
	pub fn status(&self) -> u16 {
		["Status", "StatusCode"].iter()
			.find_map(|key| self.body.get(*key).and_then(Value::as_u64))
			.and_then(|code| u16::try_from(code).ok())
			.unwrap_or(0)
	}

	pub fn question(&self) -> Vec<QuestionEntry> {
		self.section("Question").iter().filter_map(QuestionEntry::from_value).collect()
	}

	pub fn answer(&self) -> Vec<ResourceRecord> {
		self.records("Answer")
	}

	pub fn authority(&self) -> Vec<ResourceRecord> {
		self.records("Authority")
	}

	pub fn additional(&self) -> Vec<ResourceRecord> {
		self.records("Additional")
	}

	fn records(&self, key: &str) -> Vec<ResourceRecord> {
		self.section(key).iter().filter_map(ResourceRecord::from_value).collect()
	}

	/// A missing or non-array section reads as empty.
	fn section(&self, key: &str) -> &[Value] {
		self.body.get(key)
			.and_then(Value::as_array)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}
}

/// What one resolver produced for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverOutcome {
	Success { status: u16, data: DnsJsonResponse },
	Failure { error: String },
}

impl ResolverOutcome {
	pub fn failure(error: impl Into<String>) -> Self {
		ResolverOutcome::Failure { error: error.into() }
	}

	pub fn is_success(&self) -> bool {
		matches!(self, ResolverOutcome::Success { .. })
	}
}

impl Serialize for ResolverOutcome {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			ResolverOutcome::Success { status, data } => {
				let mut s = serializer.serialize_struct("ResolverOutcome", 3)?;
				s.serialize_field("ok", &true)?;
				s.serialize_field("status", status)?;
				s.serialize_field("data", data)?;
				s.end()
			}
			ResolverOutcome::Failure { error } => {
				let mut s = serializer.serialize_struct("ResolverOutcome", 2)?;
				s.serialize_field("ok", &false)?;
				s.serialize_field("error", error)?;
				s.end()
			}
		}
	}
}

/// Outcomes keyed by every resolver that took part in a lookup.
pub type ResultSet = BTreeMap<ResolverId, ResolverOutcome>;

/// Turn one upstream HTTP response into an outcome.
///
/// The body is parsed as JSON whatever the declared content type says; several
/// DoH services label DNS-JSON as something else. A parse failure is the only
/// signal of a non-JSON answer.
pub fn normalize(body: &str, status: StatusCode, content_type: Option<&str>) -> ResolverOutcome {
	if !status.is_success() {
		let snippet = snippet(body);
		return if snippet.is_empty() {
			ResolverOutcome::failure(format!("HTTP {}", status.as_u16()))
		} else {
			ResolverOutcome::failure(format!("HTTP {}: {}", status.as_u16(), snippet))
		};
	}

	match serde_json::from_str::<Value>(body) {
		Ok(value) => {
			let data = DnsJsonResponse::new(value);
			ResolverOutcome::Success { status: data.status(), data }
		}
		Err(e) => {
			debug!(error = %e, content_type = content_type.unwrap_or(""), "Upstream body is not JSON");
			let snippet = snippet(body);
			if snippet.is_empty() {
				ResolverOutcome::failure(format!("Non-JSON response ({})", content_type.unwrap_or("")))
			} else {
				ResolverOutcome::failure(snippet)
			}
		}
	}
}

fn snippet(body: &str) -> String {
	body.chars().take(ERROR_SNIPPET_CHARS).collect()
}

/// Render a numeric RR type as its mnemonic (`1` -> `A`).
pub fn record_type_name(code: u16) -> String {
	RecordType::from(code).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	const GOOGLE_A: &str = r#"{
		"Status": 0, "TC": false, "RD": true, "RA": true, "AD": false, "CD": false,
		"Question": [{"name": "example.com.", "type": 1}],
		"Answer": [
			{"name": "example.com.", "type": 1, "TTL": 300, "data": "93.184.215.14"}
		]
	}"#;

	#[test]
	fn test_parse_full_body() {
		let outcome = normalize(GOOGLE_A, StatusCode::OK, Some("application/json"));
		let ResolverOutcome::Success { status, data } = outcome else {
			panic!("expected success");
		};
		assert_eq!(status, 0);
		assert_eq!(data.question(), vec![QuestionEntry { name: "example.com.".into(), rr_type: 1 }]);
		let answer = data.answer();
		assert_eq!(answer.len(), 1);
		assert_eq!(answer[0].ttl, 300);
		assert_eq!(answer[0].data, "93.184.215.14");
		assert!(data.authority().is_empty());
		assert_eq!(data.body()["RD"], Value::Bool(true));
		assert_eq!(data.body()["Status"], Value::from(0));
	}

	#[test]
	fn test_missing_status_and_sections() {
		let outcome = normalize(r#"{"Comment": "hello"}"#, StatusCode::OK, None);
		let ResolverOutcome::Success { status, data } = outcome else {
			panic!("expected success");
		};
		assert_eq!(status, 0);
		assert!(data.question().is_empty());
		assert!(data.answer().is_empty());
		assert!(data.authority().is_empty());
		assert!(data.additional().is_empty());
		assert!(data.body().get("Answer").is_none());
	}

	#[test]
	fn test_status_code_fallback() {
		let outcome = normalize(r#"{"StatusCode": 3}"#, StatusCode::OK, None);
		assert!(matches!(outcome, ResolverOutcome::Success { status: 3, .. }));
		let outcome = normalize(r#"{"Status": 2, "StatusCode": 3}"#, StatusCode::OK, None);
		assert!(matches!(outcome, ResolverOutcome::Success { status: 2, .. }));
	}

	#[test]
	fn test_mislabelled_content_type_still_parsed() {
		let outcome = normalize(GOOGLE_A, StatusCode::OK, Some("text/plain"));
		assert!(outcome.is_success());
		let outcome = normalize(GOOGLE_A, StatusCode::OK, Some("application/dns-message"));
		assert!(outcome.is_success());
	}

	#[test]
	fn test_non_json_body_truncated() {
		let body = "x".repeat(500);
		let outcome = normalize(&body, StatusCode::OK, Some("text/html"));
		let ResolverOutcome::Failure { error } = outcome else {
			panic!("expected failure");
		};
		assert_eq!(error.chars().count(), 200);
	}

	#[test]
	fn test_truncation_respects_char_boundaries() {
		let body = "é".repeat(300);
		let ResolverOutcome::Failure { error } = normalize(&body, StatusCode::OK, None) else {
			panic!("expected failure");
		};
		assert_eq!(error, "é".repeat(200));
	}

	#[test]
	fn test_empty_body_generic_message() {
		let outcome = normalize("", StatusCode::OK, Some("application/dns-message"));
		assert_eq!(outcome, ResolverOutcome::failure("Non-JSON response (application/dns-message)"));
	}

	#[test]
	fn test_http_error_is_failure_even_with_json() {
		let outcome = normalize(r#"{"Status": 1}"#, StatusCode::BAD_REQUEST, Some("application/json"));
		assert_eq!(outcome, ResolverOutcome::failure(r#"HTTP 400: {"Status": 1}"#));
		let outcome = normalize("", StatusCode::BAD_GATEWAY, None);
		assert_eq!(outcome, ResolverOutcome::failure("HTTP 502"));
	}

	#[test]
	fn test_non_object_json_kept_as_is() {
		let ResolverOutcome::Success { status, data } = normalize("[1, 2, 3]", StatusCode::OK, None) else {
			panic!("expected success");
		};
		assert_eq!(status, 0);
		assert_eq!(data.body(), &serde_json::json!([1, 2, 3]));
		assert!(data.answer().is_empty());
	}

	#[test]
	fn test_irregular_records_pass_through_verbatim() {
		let body = r#"{"Status": 0, "Answer": [
			{"name": "a.example.", "type": 1, "TTL": 60, "data": "192.0.2.1", "Expires": "Sat, 01 Jan 2026"},
			{"name": "b.example.", "type": 1, "TTL": 60, "data": null},
			{"name": "c.example.", "type": "AAAA", "TTL": -1, "data": "2001:db8::1"},
			"garbage"
		], "Authority": "not-a-list", "Additional": []}"#;
		let ResolverOutcome::Success { data, .. } = normalize(body, StatusCode::OK, None) else {
			panic!("expected success");
		};

		let expected: Value = serde_json::from_str(body).unwrap();
		assert_eq!(serde_json::to_value(&data).unwrap(), expected);

		let answer = data.answer();
		assert_eq!(answer.len(), 3);
		assert_eq!(answer[0].data, "192.0.2.1");
		assert_eq!(answer[1].data, "");
		assert_eq!(answer[2].rr_type, 28);
		assert_eq!(answer[2].ttl, 0);
		assert!(data.authority().is_empty());
	}

	#[test]
	fn test_type_field_forms() {
		assert_eq!(type_field(Some(&Value::from(15))), 15);
		assert_eq!(type_field(Some(&Value::from("16"))), 16);
		assert_eq!(type_field(Some(&Value::from("MX"))), 15);
		assert_eq!(type_field(Some(&Value::from(70000))), 0);
		assert_eq!(type_field(None), 0);
	}

	#[test]
	fn test_empty_section_kept_in_output() {
		let outcome = normalize(r#"{"Status": 3, "Answer": []}"#, StatusCode::OK, None);
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["data"]["Answer"], serde_json::json!([]));
	}

	#[test]
	fn test_success_serialization_shape() {
		let outcome = normalize(GOOGLE_A, StatusCode::OK, None);
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["ok"], true);
		assert_eq!(json["status"], 0);
		assert_eq!(json["data"]["Answer"][0]["TTL"], 300);
		assert_eq!(json["data"]["Answer"][0]["type"], 1);
		assert_eq!(json["data"]["Status"], 0);
		assert_eq!(json["data"]["RA"], true);
		assert!(json["data"].get("Authority").is_none());
	}

	#[test]
	fn test_failure_serialization_shape() {
		let json = serde_json::to_value(ResolverOutcome::failure("boom")).unwrap();
		assert_eq!(json, serde_json::json!({ "ok": false, "error": "boom" }));
	}

	#[test]
	fn test_result_set_keys_render_lowercase() {
		let mut results = ResultSet::new();
		results.insert(ResolverId::Cloudflare, ResolverOutcome::failure("x"));
		results.insert(ResolverId::Google, ResolverOutcome::failure("y"));
		let json = serde_json::to_string(&results).unwrap();
		assert!(json.starts_with(r#"{"google":"#), "unexpected: {}", json);
		assert!(json.contains(r#""cloudflare":"#));
	}

	#[test]
	fn test_record_type_names() {
		assert_eq!(record_type_name(1), "A");
		assert_eq!(record_type_name(28), "AAAA");
		assert_eq!(record_type_name(15), "MX");
	}
}
