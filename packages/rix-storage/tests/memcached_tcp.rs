use std::{
	collections::HashMap,
	net::SocketAddr,
	sync::Arc,
	time::{Duration, Instant},
};

use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream},
};

use rix_storage::{Error, MemcachedCache};

/// Speaks just enough of the text protocol for one client connection at a time.
async fn serve(stream: TcpStream) {
	let mut store: HashMap<String, Vec<u8>> = HashMap::new();
	let (read, mut write) = stream.into_split();
	let mut reader = BufReader::new(read);

	loop {
		let mut line = String::new();

		if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
			return;
		}

		let parts: Vec<&str> = line.split_whitespace().collect();
		let reply = match parts.as_slice() {
			["set", key, _flags, _ttl, len] => {
				let len: usize = len.parse().expect("bad length");
				let mut data = vec![0u8; len + 2];

				reader.read_exact(&mut data).await.expect("short value");
				data.truncate(len);
				store.insert(key.to_string(), data);

				b"STORED\r\n".to_vec()
			},
			["get", key] => match store.get(*key) {
				Some(value) => {
					let mut reply = format!("VALUE {key} 0 {}\r\n", value.len()).into_bytes();

					reply.extend_from_slice(value);
					reply.extend_from_slice(b"\r\nEND\r\n");

					reply
				},
				None => b"END\r\n".to_vec(),
			},
			["delete", key] => match store.remove(*key) {
				Some(_) => b"DELETED\r\n".to_vec(),
				None => b"NOT_FOUND\r\n".to_vec(),
			},
			_ => b"ERROR\r\n".to_vec(),
		};

		if write.write_all(&reply).await.is_err() {
			return;
		}
	}
}

async fn spawn_server() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");

	tokio::spawn(async move {
		while let Ok((stream, _)) = listener.accept().await {
			tokio::spawn(serve(stream));
		}
	});

	addr
}

fn client(addr: String, timeout_ms: u64) -> MemcachedCache {
	pooled_client(addr, timeout_ms, 4)
}

fn pooled_client(addr: String, timeout_ms: u64, max_connections: usize) -> MemcachedCache {
	MemcachedCache::new(&rix_config::SharedCache {
		enabled: true,
		addr,
		ttl_seconds: 300,
		timeout_ms,
		max_connections,
		max_value_bytes: 1024,
	})
}

/// Accepts connections and never answers.
async fn spawn_silent_server() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");

	tokio::spawn(async move {
		let mut held = Vec::new();

		while let Ok((stream, _)) = listener.accept().await {
			held.push(stream);
		}
	});

	addr
}

#[tokio::test]
async fn set_get_delete_round_trip() {
	let cache = client(spawn_server().await.to_string(), 1_000);

	assert_eq!(cache.get("search:abc").await.expect("get failed"), None);

	cache.set("search:abc", b"{\"total\":3}", 300).await.expect("set failed");

	assert_eq!(cache.get("search:abc").await.expect("get failed"), Some(b"{\"total\":3}".to_vec()));
	assert!(cache.delete("search:abc").await.expect("delete failed"));
	assert!(!cache.delete("search:abc").await.expect("delete failed"));
}

#[tokio::test]
async fn unreachable_server_is_an_error_not_a_miss() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");

	drop(listener);

	let err = client(addr.to_string(), 500).get("search:abc").await.expect_err("expected error");

	assert!(err.is_transient());
}

#[tokio::test]
async fn silent_server_times_out() {
	let addr = spawn_silent_server().await;
	let err = client(addr.to_string(), 100).get("search:abc").await.expect_err("expected timeout");

	assert!(matches!(err, Error::Timeout { .. }));
}

#[tokio::test]
async fn concurrent_callers_each_wait_at_most_one_timeout() {
	let addr = spawn_silent_server().await;
	let cache = Arc::new(pooled_client(addr.to_string(), 200, 2));
	let mut callers = tokio::task::JoinSet::new();

	for n in 0..8 {
		let cache = Arc::clone(&cache);

		callers.spawn(async move {
			let started = Instant::now();
			let result = cache.get(&format!("search:{n}")).await;

			(started.elapsed(), result)
		});
	}

	let mut worst = Duration::ZERO;

	while let Some(joined) = callers.join_next().await {
		let (elapsed, result) = joined.expect("caller panicked");

		assert!(matches!(result, Err(Error::Timeout { .. })));

		worst = worst.max(elapsed);
	}

	assert!(worst < Duration::from_millis(600), "worst caller waited {worst:?}");
}

#[tokio::test]
async fn oversized_values_are_refused_before_sending() {
	let cache = client(spawn_server().await.to_string(), 1_000);
	let err = cache.set("search:big", &[b'x'; 2048], 300).await.expect_err("expected size error");

	assert!(matches!(err, Error::Memcached { .. }));
	assert_eq!(cache.get("search:big").await.expect("get failed"), None);
}

#[tokio::test]
async fn connections_are_reused_after_clean_exchanges() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read local addr.");
	let accepted = Arc::new(std::sync::atomic::AtomicUsize::new(0));
	let counter = Arc::clone(&accepted);

	tokio::spawn(async move {
		while let Ok((stream, _)) = listener.accept().await {
			counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
			tokio::spawn(serve(stream));
		}
	});

	let cache = client(addr.to_string(), 1_000);

	for _ in 0..5 {
		cache.set("search:abc", b"1", 300).await.expect("set failed");
		cache.get("search:abc").await.expect("get failed");
	}

	assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
}
