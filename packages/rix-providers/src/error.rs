pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error("Room {room_id} not found at source.")]
	NotFound { room_id: String },
	#[error("Rooms service returned status {status}: {body}")]
	Status { status: u16, body: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Whether retrying the same call later may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Reqwest(err) => !(err.is_decode() || err.is_builder()),
			Self::Status { status, .. } => *status >= 500 || *status == 429,
			Self::NotFound { .. } | Self::InvalidResponse { .. } => false,
		}
	}
}
