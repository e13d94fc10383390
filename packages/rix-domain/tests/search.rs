use rix_domain::{RoomQuery, RoomSearchRequest, RoomType, SortOrder};

#[test]
fn start_offset_follows_page_and_limit() {
	let query = RoomQuery { page: 3, limit: 25, ..RoomQuery::default() };

	assert_eq!(query.start(), 50);
	assert_eq!(RoomQuery { page: 1, limit: 10, ..RoomQuery::default() }.start(), 0);
}

#[test]
fn sort_tokens_fall_back_to_default() {
	assert_eq!(SortOrder::parse("price_desc"), SortOrder::PriceDesc);
	assert_eq!(SortOrder::parse(" Capacity_Asc "), SortOrder::CapacityAsc);
	assert_eq!(SortOrder::parse("rating_desc"), SortOrder::Default);
	assert_eq!(SortOrder::parse(""), SortOrder::Default);
}

#[test]
fn request_deserializes_from_wire_names() {
	let request: RoomSearchRequest = serde_json::from_value(serde_json::json!({
		"type": "suite",
		"has_wifi": true,
		"page": 2,
	}))
	.expect("Expected request to deserialize.");

	assert_eq!(request.room_type, Some(RoomType::Suite));
	assert_eq!(request.has_wifi, Some(true));
	assert_eq!(request.page, Some(2));
	assert!(request.limit.is_none());
}
