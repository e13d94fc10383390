use std::net::SocketAddr;

use axum::{
	Json, Router,
	extract::Path,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;

use rix_providers::{Error, RoomsClient};

async fn room(Path(id): Path<String>) -> Response {
	match id.as_str() {
		"42" => Json(serde_json::json!({
			"id": "42",
			"number": "305",
			"type": "deluxe",
			"status": "occupied",
			"price": 320.5,
			"capacity": 3,
			"floor": 3,
			"has_tv": true,
		}))
		.into_response(),
		"77" => (StatusCode::OK, "<html>maintenance page</html>").into_response(),
		"500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
		_ => StatusCode::NOT_FOUND.into_response(),
	}
}

async fn spawn_rooms_service() -> SocketAddr {
	let app = Router::new().route("/api/v1/rooms/{id}", get(room));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	addr
}

fn client_for(addr: SocketAddr) -> RoomsClient {
	let cfg = rix_config::Source {
		api_base: format!("http://{addr}"),
		rooms_path: "/api/v1/rooms".to_string(),
		timeout_ms: 2_000,
	};

	RoomsClient::new(&cfg).expect("Failed to build client.")
}

#[tokio::test]
async fn fetches_and_normalizes_room() {
	let client = client_for(spawn_rooms_service().await);
	let room = client.fetch_room("42").await.expect("Fetch failed.");

	assert_eq!(room.number, "305");
	assert_eq!(room.price, 320.5);
	assert!(room.has_tv);
}

#[tokio::test]
async fn missing_room_is_not_found() {
	let client = client_for(spawn_rooms_service().await);
	let err = client.fetch_room("9").await.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound { ref room_id } if room_id == "9"));
	assert!(!err.is_transient());
}

#[tokio::test]
async fn server_errors_are_transient() {
	let client = client_for(spawn_rooms_service().await);
	let err = client.fetch_room("500").await.expect_err("Expected status error.");

	assert!(matches!(err, Error::Status { status: 500, .. }));
	assert!(err.is_transient());
}

#[tokio::test]
async fn undecodable_success_body_is_permanent() {
	let client = client_for(spawn_rooms_service().await);
	let err = client.fetch_room("77").await.expect_err("Expected decode error.");

	assert!(matches!(err, Error::InvalidResponse { .. }));
	assert!(!err.is_transient());
}

#[tokio::test]
async fn unreachable_source_is_transient() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");

	drop(listener);

	let err = client_for(addr).fetch_room("1").await.expect_err("Expected connect error.");

	assert!(err.is_transient());
}
