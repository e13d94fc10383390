#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("Index engine returned status {status}: {body}")]
	Engine { status: u16, body: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Memcached error: {message}")]
	Memcached { message: String },
	#[error("{operation} timed out.")]
	Timeout { operation: String },
}
impl Error {
	/// Whether the dependency may recover on its own, so the same call is worth retrying.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Reqwest(err) => !(err.is_decode() || err.is_builder()),
			Self::Io(_) | Self::Timeout { .. } => true,
			Self::Engine { status, .. } => *status >= 500 || *status == 429,
			Self::SerdeJson(_) | Self::InvalidResponse { .. } | Self::Memcached { .. } => false,
		}
	}
}
