use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};

use anyhow::Result;

use crate::dns::{record_type_name, ResolverOutcome, ResourceRecord, ResultSet};

/// One printable line of a lookup: a record, an empty answer, or a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRow {
	pub resolver: String,
	pub ok: bool,
	pub status: Option<u16>,
	pub section: &'static str,
	pub name: String,
	pub record_type: String,
	pub ttl: Option<u32>,
	pub data: String,
	pub error: String,
}

/// Flatten a result set into rows, one per record.
pub fn outcome_rows(results: &ResultSet) -> Vec<OutcomeRow> {
	let mut rows = Vec::new();
	for (id, outcome) in results {
		match outcome {
			ResolverOutcome::Success { status, data } => {
				let sections: [(&'static str, Vec<ResourceRecord>); 3] = [
					("answer", data.answer()),
					("authority", data.authority()),
					("additional", data.additional()),
				];
				let before = rows.len();
				for (section, records) in sections {
					for record in records {
						rows.push(OutcomeRow {
							resolver: id.to_string(),
							ok: true,
							status: Some(*status),
							section,
							name: record.name.clone(),
							record_type: record_type_name(record.rr_type),
							ttl: Some(record.ttl),
							data: record.data.clone(),
							error: String::new(),
						});
					}
				}
				// Keep resolvers that answered with no records visible.
				if rows.len() == before {
					rows.push(OutcomeRow {
						resolver: id.to_string(),
						ok: true,
						status: Some(*status),
						section: "",
						name: String::new(),
						record_type: String::new(),
						ttl: None,
						data: String::new(),
						error: String::new(),
					});
				}
			}
			ResolverOutcome::Failure { error } => rows.push(OutcomeRow {
				resolver: id.to_string(),
				ok: false,
				status: None,
				section: "",
				name: String::new(),
				record_type: String::new(),
				ttl: None,
				data: String::new(),
				error: error.clone(),
			}),
		}
	}
	rows
}

/// Print every resolver's outcome as a formatted table.
pub fn print_results_table(name: &str, record_type: &str, results: &ResultSet) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Resolver", "Status", "Name", "Type", "TTL", "Data",
	]);

	for row in outcome_rows(results) {
		let status = match row.status {
			Some(code) => format!("{}", code),
			None => "ERROR".to_string(),
		};
		let data = if row.ok { row.data } else { row.error };
		table.add_row(vec![
			row.resolver,
			status,
			row.name,
			row.record_type,
			row.ttl.map(|t| t.to_string()).unwrap_or_default(),
			data,
		]);
	}

	let succeeded = results.values().filter(|o| o.is_success()).count();
	println!("\n{} {} ({}/{} resolvers answered)", name, record_type, succeeded, results.len());
	println!("{table}");
}

/// Write lookup results to a CSV file.
pub fn write_csv(path: &str, results: &ResultSet) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"resolver", "ok", "status", "section", "name", "type", "ttl", "data", "error",
	])?;

	for row in outcome_rows(results) {
		writer.write_record([
			row.resolver,
			row.ok.to_string(),
			row.status.map(|s| s.to_string()).unwrap_or_default(),
			row.section.to_string(),
			row.name,
			row.record_type,
			row.ttl.map(|t| t.to_string()).unwrap_or_default(),
			row.data,
			row.error,
		])?;
	}

	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}
