//! Redis-backed caching for poster paths and catalog detail records

pub mod cache;

mod macros;

pub use cache::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
