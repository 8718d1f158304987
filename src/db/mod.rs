pub mod redis;

pub use self::redis::cache::create_redis_client;
pub use self::redis::cache::Cache;
pub use self::redis::cache::CacheKey;
