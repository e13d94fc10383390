use std::sync::Arc;

use rix_service::RixService;

/// One service per process: the consumer's invalidations must reach the query path.
#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RixService>,
}
impl AppState {
	pub fn new(config: rix_config::Config) -> color_eyre::Result<Self> {
		Ok(Self::from_service(Arc::new(RixService::new(config)?)))
	}

	pub fn from_service(service: Arc<RixService>) -> Self {
		Self { service }
	}
}
