pub mod local_cache;
pub mod memcached;
pub mod solr;

mod error;

pub use error::Error;
pub use local_cache::LocalCache;
pub use memcached::MemcachedCache;
pub use solr::SolrStore;

pub type Result<T, E = Error> = std::result::Result<T, E>;
