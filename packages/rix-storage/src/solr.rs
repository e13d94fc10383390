// std
use std::{collections::BTreeMap, time::Duration};

// crates.io
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

// self
use crate::{Error, Result};
use rix_domain::{
	FacetCounts, IndexedRoom, PriceRange, QueryPage, RoomQuery, RoomStatus, RoomType, SortOrder,
};

pub const PRICE_RANGE_START: f64 = 0.0;
pub const PRICE_RANGE_END: f64 = 1_000.0;
pub const PRICE_RANGE_GAP: f64 = 100.0;
pub const AMENITY_FIELDS: [&str; 4] = ["has_wifi", "has_ac", "has_tv", "has_minibar"];

const TEXT_FIELDS: [&str; 3] = ["number", "type", "description"];
const SPECIAL_CHARS: &str = "+-&|!(){}[]^\"~*?:\\/";

pub type Params = Vec<(&'static str, String)>;

/// Client for one engine core. Every write requests a synchronous commit.
pub struct SolrStore {
	client: Client,
	base: String,
}
impl SolrStore {
	pub fn new(cfg: &rix_config::Index) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, base: cfg.url.clone() })
	}

	pub async fn upsert(&self, room: &IndexedRoom) -> Result<()> {
		let body = Value::Array(vec![write_document(room)?]);

		self.update(&body).await
	}

	pub async fn delete(&self, id: &str) -> Result<()> {
		self.update(&serde_json::json!({ "delete": { "id": id } })).await
	}

	/// Real-time get, which sees committed writes without waiting for a searcher reopen.
	pub async fn get(&self, id: &str) -> Result<Option<IndexedRoom>> {
		let req = self.client.get(format!("{}/get", self.base)).query(&[("id", id), ("wt", "json")]);
		let json = self.read(req).await?;

		Ok(json.get("doc").filter(|doc| doc.is_object()).map(IndexedRoom::from_document))
	}

	pub async fn query(&self, query: &RoomQuery) -> Result<QueryPage> {
		let json = self.select(&select_params(query)).await?;

		decode_page(&json)
	}

	pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
		let json = self.select(&suggest_params(prefix, limit)).await?;
		let page = decode_page(&json)?;

		Ok(collect_suggestions(&page.docs, prefix, limit))
	}

	pub async fn facets(&self) -> Result<FacetCounts> {
		let json = self.select(&facet_params()).await?;

		decode_facets(&json)
	}

	pub async fn ping(&self) -> Result<()> {
		let req = self.client.get(format!("{}/admin/ping", self.base)).query(&[("wt", "json")]);
		let json = self.read(req).await?;

		match json.get("status").and_then(Value::as_str) {
			Some("OK") => Ok(()),
			other => Err(Error::InvalidResponse {
				message: format!("Index engine ping reported status {other:?}."),
			}),
		}
	}

	async fn update(&self, body: &Value) -> Result<()> {
		let res = self
			.client
			.post(format!("{}/update", self.base))
			.query(&[("commit", "true"), ("wt", "json")])
			.json(body)
			.send()
			.await?;

		check_status(res).await?;

		Ok(())
	}

	async fn select(&self, params: &[(&'static str, String)]) -> Result<Value> {
		self.read(self.client.get(format!("{}/select", self.base)).query(params)).await
	}

	async fn read(&self, req: RequestBuilder) -> Result<Value> {
		let res = check_status(req.send().await?).await?;
		let body = res.bytes().await?;

		Ok(serde_json::from_slice(&body)?)
	}
}

async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();

	Err(Error::Engine { status: status.as_u16(), body })
}

/// Engine write form of `room`. Nulls and empty strings are left out so the engine stores
/// nothing rather than an empty term.
pub fn write_document(room: &IndexedRoom) -> Result<Value> {
	let mut doc = serde_json::to_value(room)?;

	if let Value::Object(fields) = &mut doc {
		fields.retain(|_, value| match value {
			Value::Null => false,
			Value::String(raw) => !raw.is_empty(),
			_ => true,
		});
	}

	Ok(doc)
}

pub fn select_params(query: &RoomQuery) -> Params {
	let mut params = vec![("q", text_clause(query.text.as_deref()))];

	params.extend(filter_clauses(query).into_iter().map(|clause| ("fq", clause)));
	params.push(("sort", sort_clause(query.sort).to_string()));
	params.push(("start", query.start().to_string()));
	params.push(("rows", query.limit.to_string()));
	params.push(("wt", "json".to_string()));

	params
}

/// One clause per present filter; the engine intersects them.
pub fn filter_clauses(query: &RoomQuery) -> Vec<String> {
	let mut clauses = Vec::new();

	if let Some(room_type) = query.room_type.filter(|kind| *kind != RoomType::Unspecified) {
		clauses.push(format!("type:{}", room_type.as_str()));
	}
	if let Some(status) = query.status.filter(|status| *status != RoomStatus::Unspecified) {
		clauses.push(format!("status:{}", status.as_str()));
	}
	if let Some(floor) = query.floor {
		clauses.push(format!("floor:{}", escape_term(&floor.to_string())));
	}
	if query.min_price.is_some() || query.max_price.is_some() {
		clauses.push(format!(
			"price:[{} TO {}]",
			range_bound(query.min_price),
			range_bound(query.max_price)
		));
	}

	let amenities = [query.has_wifi, query.has_ac, query.has_tv, query.has_minibar];

	for (field, value) in AMENITY_FIELDS.iter().zip(amenities) {
		if let Some(value) = value {
			clauses.push(format!("{field}:{value}"));
		}
	}

	clauses
}

pub fn sort_clause(sort: SortOrder) -> &'static str {
	match sort {
		SortOrder::PriceAsc => "price asc,id asc",
		SortOrder::PriceDesc => "price desc,id asc",
		SortOrder::CapacityAsc => "capacity asc,id asc",
		SortOrder::CapacityDesc => "capacity desc,id asc",
		SortOrder::Default => "number asc,id asc",
	}
}

pub fn escape_term(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if SPECIAL_CHARS.contains(ch) || ch.is_whitespace() {
			escaped.push('\\');
		}

		escaped.push(ch);
	}

	escaped
}

fn text_clause(text: Option<&str>) -> String {
	match text.map(str::trim).filter(|text| !text.is_empty()) {
		Some(text) => {
			let term = escape_term(text);

			TEXT_FIELDS.iter().map(|field| format!("{field}:*{term}*")).collect::<Vec<_>>().join(" OR ")
		},
		None => "*:*".to_string(),
	}
}

fn range_bound(bound: Option<f64>) -> String {
	bound.map(|value| value.to_string()).unwrap_or_else(|| "*".to_string())
}

fn suggest_params(prefix: &str, limit: usize) -> Params {
	let term = escape_term(prefix.trim());
	let type_term = term.to_ascii_lowercase();

	vec![
		("q", format!("number:{term}* OR type:{type_term}*")),
		("fl", "id,number,type".to_string()),
		("sort", sort_clause(SortOrder::Default).to_string()),
		("rows", limit.saturating_mul(2).max(1).to_string()),
		("wt", "json".to_string()),
	]
}

fn facet_params() -> Params {
	let mut params = vec![
		("q", "*:*".to_string()),
		("rows", "0".to_string()),
		("wt", "json".to_string()),
		("facet", "true".to_string()),
		("facet.field", "type".to_string()),
		("facet.field", "status".to_string()),
		("facet.field", "floor".to_string()),
	];

	params.extend(AMENITY_FIELDS.iter().map(|field| ("facet.query", format!("{field}:true"))));
	params.extend([
		("facet.range", "price".to_string()),
		("facet.range.start", PRICE_RANGE_START.to_string()),
		("facet.range.end", PRICE_RANGE_END.to_string()),
		("facet.range.gap", PRICE_RANGE_GAP.to_string()),
	]);

	params
}

fn invalid(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}

fn decode_page(json: &Value) -> Result<QueryPage> {
	let response = json
		.get("response")
		.ok_or_else(|| invalid("Select response is missing the response object."))?;
	let total = response
		.get("numFound")
		.and_then(Value::as_u64)
		.ok_or_else(|| invalid("Select response is missing numFound."))?;
	let docs = response
		.get("docs")
		.and_then(Value::as_array)
		.map(|docs| docs.iter().map(IndexedRoom::from_document).collect())
		.unwrap_or_default();

	Ok(QueryPage { docs, total })
}

fn collect_suggestions(docs: &[IndexedRoom], prefix: &str, limit: usize) -> Vec<String> {
	let needle = prefix.trim().to_lowercase();
	let mut suggestions: Vec<String> = Vec::new();

	for doc in docs {
		for candidate in [doc.number.as_str(), doc.room_type.as_str()] {
			if suggestions.len() >= limit {
				return suggestions;
			}
			if candidate.is_empty() || !candidate.to_lowercase().starts_with(&needle) {
				continue;
			}
			if !suggestions.iter().any(|seen| seen == candidate) {
				suggestions.push(candidate.to_string());
			}
		}
	}

	suggestions.truncate(limit);

	suggestions
}

fn decode_facets(json: &Value) -> Result<FacetCounts> {
	let counts =
		json.get("facet_counts").ok_or_else(|| invalid("Select response is missing facet_counts."))?;
	let fields = counts.get("facet_fields");
	let field = |name: &str| facet_pairs(fields.and_then(|fields| fields.get(name)));
	let non_zero = |pairs: Vec<(String, u64)>| {
		pairs.into_iter().filter(|(_, count)| *count > 0).collect::<BTreeMap<_, _>>()
	};
	let floor_counts = field("floor")
		.into_iter()
		.filter(|(_, count)| *count > 0)
		.filter_map(|(floor, count)| Some((floor.parse::<i64>().ok()?, count)))
		.collect();
	let amenity_counts = counts
		.get("facet_queries")
		.and_then(Value::as_object)
		.map(|queries| {
			queries
				.iter()
				.filter_map(|(query, count)| {
					let field = query.strip_suffix(":true")?;

					Some((field.to_string(), count.as_u64()?))
				})
				.collect()
		})
		.unwrap_or_default();
	let price = counts.get("facet_ranges").and_then(|ranges| ranges.get("price"));
	let gap = price
		.and_then(|price| price.get("gap"))
		.and_then(|gap| gap.as_f64().or_else(|| gap.as_str()?.parse().ok()))
		.unwrap_or(PRICE_RANGE_GAP);
	let price_ranges = facet_pairs(price.and_then(|price| price.get("counts")))
		.into_iter()
		.filter_map(|(start, count)| {
			let min = start.parse::<f64>().ok()?;

			Some(PriceRange { min, max: min + gap, count })
		})
		.collect();

	Ok(FacetCounts {
		room_types: non_zero(field("type")),
		status_counts: non_zero(field("status")),
		floor_counts,
		amenity_counts,
		price_ranges,
	})
}

/// Facet lists arrive flat (`[term, count, term, count]`) or, with `json.nl=map`, as an object.
fn facet_pairs(value: Option<&Value>) -> Vec<(String, u64)> {
	match value {
		Some(Value::Array(flat)) => flat
			.chunks(2)
			.filter_map(|pair| match pair {
				[term, count] => Some((facet_term(term)?, count.as_u64()?)),
				_ => None,
			})
			.collect(),
		Some(Value::Object(map)) =>
			map.iter().filter_map(|(term, count)| Some((term.clone(), count.as_u64()?))).collect(),
		_ => Vec::new(),
	}
}

fn facet_term(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => Some(raw.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn values<'a>(params: &'a Params, key: &str) -> Vec<&'a str> {
		params.iter().filter(|(name, _)| *name == key).map(|(_, value)| value.as_str()).collect()
	}

	#[test]
	fn select_params_include_only_present_filters() {
		let query = RoomQuery {
			room_type: Some(RoomType::Suite),
			min_price: Some(100.0),
			has_wifi: Some(true),
			sort: SortOrder::PriceDesc,
			page: 3,
			limit: 20,
			..Default::default()
		};
		let params = select_params(&query);

		assert_eq!(values(&params, "q"), vec!["*:*"]);
		assert_eq!(values(&params, "fq"), vec!["type:suite", "price:[100 TO *]", "has_wifi:true"]);
		assert_eq!(values(&params, "sort"), vec!["price desc,id asc"]);
		assert_eq!(values(&params, "start"), vec!["40"]);
		assert_eq!(values(&params, "rows"), vec!["20"]);
	}

	#[test]
	fn price_range_is_inclusive_on_both_bounds() {
		let query = RoomQuery {
			min_price: Some(49.5),
			max_price: Some(150.0),
			page: 1,
			limit: 10,
			..Default::default()
		};

		assert_eq!(filter_clauses(&query), vec!["price:[49.5 TO 150]"]);
	}

	#[test]
	fn negative_floor_is_escaped() {
		let query = RoomQuery { floor: Some(-1), page: 1, limit: 10, ..Default::default() };

		assert_eq!(filter_clauses(&query), vec!["floor:\\-1"]);
	}

	#[test]
	fn text_query_searches_each_text_field() {
		let query = RoomQuery { text: Some("sea view".to_string()), page: 1, limit: 10, ..Default::default() };
		let params = select_params(&query);

		assert_eq!(
			values(&params, "q"),
			vec!["number:*sea\\ view* OR type:*sea\\ view* OR description:*sea\\ view*"]
		);
	}

	#[test]
	fn default_sort_orders_by_room_number() {
		assert_eq!(sort_clause(SortOrder::Default), "number asc,id asc");
	}

	#[test]
	fn scalar_and_sequence_fields_decode_identically() {
		let json = serde_json::json!({
			"response": {
				"numFound": 57,
				"docs": [
					{ "id": "1", "number": ["101"], "has_wifi": [true], "price": [99.0] },
					{ "id": "2", "number": "102", "has_wifi": true, "price": 99.0 },
				],
			}
		});
		let page = decode_page(&json).expect("decode failed");

		assert_eq!(page.total, 57);
		assert_eq!(page.docs.len(), 2);
		assert!(page.docs.iter().all(|doc| doc.has_wifi && doc.price == 99.0));
		assert_eq!(page.docs[0].number, "101");
	}

	#[test]
	fn select_response_without_count_is_rejected() {
		let json = serde_json::json!({ "response": { "docs": [] } });

		assert!(matches!(decode_page(&json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn write_document_drops_empty_fields() {
		let room = IndexedRoom { id: "7".to_string(), number: "7".to_string(), ..Default::default() };
		let doc = write_document(&room).expect("serialize failed");

		assert_eq!(doc.get("id"), Some(&Value::String("7".to_string())));
		assert!(doc.get("type").is_none());
		assert!(doc.get("applied_at").is_none());
		assert_eq!(doc.get("has_wifi"), Some(&Value::Bool(false)));
	}

	#[test]
	fn suggestions_are_deduplicated_in_order() {
		let room = |number: &str, room_type| IndexedRoom {
			number: number.to_string(),
			room_type,
			..Default::default()
		};
		let docs = vec![
			room("S1", RoomType::Suite),
			room("S2", RoomType::Suite),
			room("101", RoomType::Single),
		];

		assert_eq!(collect_suggestions(&docs, "s", 10), vec!["S1", "suite", "S2", "single"]);
		assert_eq!(collect_suggestions(&docs, "s", 2), vec!["S1", "suite"]);
	}

	#[test]
	fn facets_decode_flat_lists() {
		let json = serde_json::json!({
			"response": { "numFound": 5, "docs": [] },
			"facet_counts": {
				"facet_queries": { "has_wifi:true": 4, "has_tv:true": 1 },
				"facet_fields": {
					"type": ["suite", 3, "single", 2, "deluxe", 0],
					"status": ["available", 5],
					"floor": ["1", 2, "2", 3],
				},
				"facet_ranges": {
					"price": { "counts": ["0.0", 1, "100.0", 4], "gap": 100.0 },
				},
			}
		});
		let facets = decode_facets(&json).expect("decode failed");

		assert_eq!(facets.room_types.get("suite"), Some(&3));
		assert!(!facets.room_types.contains_key("deluxe"));
		assert_eq!(facets.floor_counts.get(&2), Some(&3));
		assert_eq!(facets.amenity_counts.get("has_wifi"), Some(&4));
		assert_eq!(
			facets.price_ranges,
			vec![
				PriceRange { min: 0.0, max: 100.0, count: 1 },
				PriceRange { min: 100.0, max: 200.0, count: 4 },
			]
		);
	}
}
