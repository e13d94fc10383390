pub mod rooms;

mod error;

pub use error::{Error, Result};
pub use rooms::RoomsClient;
