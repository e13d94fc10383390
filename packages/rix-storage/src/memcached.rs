//! Shared cache tier speaking the memcached text protocol.
//!
//! Only `get`, `set` and `delete` are used. A miss is `Ok(None)`, never an error. Calls draw
//! from a bounded pool of connections; waiting for a free connection counts against the same
//! per-call timeout as the exchange itself, so a hung server costs each caller at most one
//! timeout. A connection is returned to the pool only after a clean exchange.

// std
use std::{
	sync::{Mutex, MutexGuard},
	time::Duration,
};

// crates.io
use tokio::{
	io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream},
	net::TcpStream,
	sync::{Semaphore, SemaphorePermit},
	time,
};

// self
use crate::{Error, Result};

/// Longest relative expiration; larger values are read by the server as absolute unix time.
pub const MAX_RELATIVE_TTL_SECONDS: u64 = 60 * 60 * 24 * 30;
pub const MAX_KEY_LEN: usize = 250;

type Connection = BufStream<TcpStream>;

pub struct MemcachedCache {
	addr: String,
	timeout: Duration,
	max_value_bytes: usize,
	permits: Semaphore,
	idle: Mutex<Vec<Connection>>,
}
impl MemcachedCache {
	pub fn new(cfg: &rix_config::SharedCache) -> Self {
		Self {
			addr: cfg.addr.clone(),
			timeout: Duration::from_millis(cfg.timeout_ms),
			max_value_bytes: cfg.max_value_bytes,
			permits: Semaphore::new(cfg.max_connections.max(1)),
			idle: Mutex::new(Vec::new()),
		}
	}

	pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
		validate_key(key)?;

		let result = time::timeout(self.timeout, async {
			let mut lease = self.lease().await?;
			let conn = &mut lease.conn;

			conn.write_all(&encode_get(key)).await?;
			conn.flush().await?;

			let value = read_get_response(conn, key, self.max_value_bytes).await?;

			lease.release();

			Ok::<_, Error>(value)
		})
		.await;

		finish("get", result)
	}

	pub async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()> {
		validate_key(key)?;

		if value.len() > self.max_value_bytes {
			return Err(protocol(format!(
				"Value of {} bytes exceeds the {} byte limit.",
				value.len(),
				self.max_value_bytes
			)));
		}

		let result = time::timeout(self.timeout, async {
			let mut lease = self.lease().await?;
			let conn = &mut lease.conn;

			conn.write_all(&encode_set(key, value, ttl_seconds)).await?;
			conn.flush().await?;

			match read_line(conn).await?.as_str() {
				"STORED" => {
					lease.release();

					Ok::<_, Error>(())
				},
				other => Err(protocol(format!("Unexpected set reply {other:?}."))),
			}
		})
		.await;

		finish("set", result)
	}

	/// Returns whether an entry was removed.
	pub async fn delete(&self, key: &str) -> Result<bool> {
		validate_key(key)?;

		let result = time::timeout(self.timeout, async {
			let mut lease = self.lease().await?;
			let conn = &mut lease.conn;

			conn.write_all(format!("delete {key}\r\n").as_bytes()).await?;
			conn.flush().await?;

			let removed = match read_line(conn).await?.as_str() {
				"DELETED" => true,
				"NOT_FOUND" => false,
				other => return Err(protocol(format!("Unexpected delete reply {other:?}."))),
			};

			lease.release();

			Ok::<_, Error>(removed)
		})
		.await;

		finish("delete", result)
	}

	async fn lease(&self) -> Result<Lease<'_>> {
		let permit =
			self.permits.acquire().await.map_err(|_| protocol("Memcached pool is closed."))?;
		let pooled = lock(&self.idle).pop();
		let conn = match pooled {
			Some(conn) => conn,
			None => {
				let stream = TcpStream::connect(&self.addr).await?;

				stream.set_nodelay(true)?;
				tracing::debug!(addr = %self.addr, "Memcached connection opened.");

				BufStream::new(stream)
			},
		};

		Ok(Lease { idle: &self.idle, conn, _permit: permit })
	}
}

/// One connection checked out of the pool. Dropping it without [`Lease::release`] closes the
/// connection, which is what happens after any error or timeout.
struct Lease<'a> {
	idle: &'a Mutex<Vec<Connection>>,
	conn: Connection,
	_permit: SemaphorePermit<'a>,
}
impl Lease<'_> {
	fn release(self) {
		let Lease { idle, conn, _permit } = self;

		lock(idle).push(conn);
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn finish<T>(
	operation: &str,
	result: std::result::Result<Result<T>, time::error::Elapsed>,
) -> Result<T> {
	result.map_err(|_| Error::Timeout { operation: format!("Memcached {operation}") })?
}

fn protocol(message: impl Into<String>) -> Error {
	Error::Memcached { message: message.into() }
}

pub fn validate_key(key: &str) -> Result<()> {
	if key.is_empty() || key.len() > MAX_KEY_LEN {
		return Err(protocol(format!("Key length {} is outside 1..={MAX_KEY_LEN}.", key.len())));
	}
	if key.bytes().any(|byte| byte.is_ascii_whitespace() || byte.is_ascii_control()) {
		return Err(protocol("Key must not contain whitespace or control characters."));
	}

	Ok(())
}

pub fn encode_get(key: &str) -> Vec<u8> {
	format!("get {key}\r\n").into_bytes()
}

pub fn encode_set(key: &str, value: &[u8], ttl_seconds: u64) -> Vec<u8> {
	let ttl = ttl_seconds.min(MAX_RELATIVE_TTL_SECONDS);
	let mut frame = format!("set {key} 0 {ttl} {}\r\n", value.len()).into_bytes();

	frame.extend_from_slice(value);
	frame.extend_from_slice(b"\r\n");

	frame
}

/// Reads `VALUE <key> <flags> <bytes>` blocks up to the terminating `END`. A block longer
/// than `max_value_bytes` is refused before anything is allocated for it.
pub async fn read_get_response<R>(
	reader: &mut R,
	key: &str,
	max_value_bytes: usize,
) -> Result<Option<Vec<u8>>>
where
	R: AsyncBufRead + Unpin,
{
	let mut found = None;

	loop {
		let line = read_line(reader).await?;

		if line == "END" {
			return Ok(found);
		}

		let mut parts = line.split_ascii_whitespace();
		let (Some("VALUE"), Some(value_key), Some(_flags), Some(len)) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(protocol(format!("Unexpected get reply {line:?}.")));
		};
		let len = len
			.parse::<usize>()
			.map_err(|_| protocol(format!("Invalid value length in {line:?}.")))?;

		if len > max_value_bytes {
			return Err(protocol(format!(
				"Value of {len} bytes exceeds the {max_value_bytes} byte limit."
			)));
		}

		let mut data = vec![0u8; len + 2];

		reader.read_exact(&mut data).await?;

		if !data.ends_with(b"\r\n") {
			return Err(protocol("Value block is not terminated by CRLF."));
		}

		data.truncate(len);

		if value_key == key {
			found = Some(data);
		}
	}
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
	R: AsyncBufRead + Unpin,
{
	let mut line = String::new();

	if reader.read_line(&mut line).await? == 0 {
		return Err(protocol("Connection closed by server."));
	}

	let line = line.trim_end_matches(['\r', '\n']).to_string();

	if line == "ERROR" || line.starts_with("CLIENT_ERROR") || line.starts_with("SERVER_ERROR") {
		return Err(protocol(line));
	}

	Ok(line)
}
