use rix_domain::{ChangeEvent, DecodeError, EventKind, RoomStatus};

#[test]
fn decodes_minimal_created_event_with_string_id() {
	let event = ChangeEvent::decode(br#"{"event_type":"room.created","room_id":"42"}"#, "room.created")
		.expect("Expected event to decode.");

	assert_eq!(event.kind, EventKind::Created);
	assert_eq!(event.room_id, "42");
	assert!(event.payload.is_none());
	assert!(event.timestamp.is_none());
}

#[test]
fn numeric_room_id_and_bare_event_type_are_accepted() {
	let event = ChangeEvent::decode(
		br#"{"event_type":"updated","room_id":7,"timestamp":"2025-05-01T12:00:00Z"}"#,
		"room.updated",
	)
	.expect("Expected event to decode.");

	assert_eq!(event.kind, EventKind::Updated);
	assert_eq!(event.room_id, "7");
	assert!(event.timestamp.is_some());
}

#[test]
fn routing_key_supplies_missing_event_type() {
	let event = ChangeEvent::decode(br#"{"room_id":3}"#, "reservation.cancelled")
		.expect("Expected event to decode.");

	assert_eq!(event.kind, EventKind::ReservationCanceled);
	assert_eq!(event.target_status(), Some(RoomStatus::Available));
}

#[test]
fn room_id_falls_back_to_payload_id() {
	let event = ChangeEvent::decode(
		br#"{"event_type":"room.updated","data":{"id":"11","status":"occupied"}}"#,
		"room.updated",
	)
	.expect("Expected event to decode.");

	assert_eq!(event.room_id, "11");
	assert!(event.payload.is_some());
}

#[test]
fn status_change_requires_a_known_status() {
	let ok = ChangeEvent::decode(
		br#"{"event_type":"room.status.changed","room_id":"5","new_status":"maintenance"}"#,
		"room.status.changed",
	)
	.expect("Expected event to decode.");

	assert_eq!(ok.target_status(), Some(RoomStatus::Maintenance));

	let err = ChangeEvent::decode(
		br#"{"event_type":"room.status.changed","room_id":"5","new_status":"gone"}"#,
		"room.status.changed",
	)
	.expect_err("Expected missing status error.");

	assert!(matches!(err, DecodeError::MissingStatus));
}

#[test]
fn reservation_status_field_does_not_leak_into_room_status() {
	let event = ChangeEvent::decode(
		br#"{"event_type":"reservation.created","room_id":9,"status":"confirmed"}"#,
		"reservation.created",
	)
	.expect("Expected event to decode.");

	assert_eq!(event.target_status(), Some(RoomStatus::Reserved));
	assert!(event.new_status.is_none());
}

#[test]
fn malformed_payloads_are_rejected() {
	assert!(matches!(ChangeEvent::decode(b"not json", "room.created"), Err(DecodeError::Json(_))));
	assert!(matches!(
		ChangeEvent::decode(br#"{"event_type":"room.created"}"#, "room.created"),
		Err(DecodeError::MissingRoomId)
	));
	assert!(matches!(
		ChangeEvent::decode(
			br#"{"event_type":"room.created","room_id":"1","timestamp":"yesterday"}"#,
			"room.created"
		),
		Err(DecodeError::InvalidTimestamp(_))
	));
}

#[test]
fn unknown_kinds_are_distinguished_from_malformed_messages() {
	let err = ChangeEvent::decode(br#"{"event_type":"room.painted","room_id":"1"}"#, "room.painted")
		.expect_err("Expected unknown kind.");

	assert!(err.is_unknown_kind());
}
