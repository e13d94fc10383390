pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Index error: {message}")]
	Index { message: String, transient: bool },
	#[error("Source error: {message}")]
	Source { message: String, transient: bool },
	#[error("Timeout: {message}")]
	Timeout { message: String },
	#[error("Decode error: {message}")]
	Decode { message: String },
}
impl Error {
	/// Failures a later redelivery of the same message may get past.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Index { transient, .. } | Self::Source { transient, .. } => *transient,
			Self::Timeout { .. } => true,
			Self::InvalidRequest { .. } | Self::NotFound { .. } | Self::Decode { .. } => false,
		}
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<rix_storage::Error> for Error {
	fn from(err: rix_storage::Error) -> Self {
		match err {
			rix_storage::Error::Timeout { operation } =>
				Self::Timeout { message: format!("{operation} timed out.") },
			other => Self::Index { transient: other.is_transient(), message: other.to_string() },
		}
	}
}

impl From<rix_providers::Error> for Error {
	fn from(err: rix_providers::Error) -> Self {
		match err {
			rix_providers::Error::NotFound { room_id } =>
				Self::NotFound { message: format!("Room {room_id} does not exist at the source.") },
			other => Self::Source { transient: other.is_transient(), message: other.to_string() },
		}
	}
}

impl From<rix_domain::DecodeError> for Error {
	fn from(err: rix_domain::DecodeError) -> Self {
		Self::Decode { message: err.to_string() }
	}
}
