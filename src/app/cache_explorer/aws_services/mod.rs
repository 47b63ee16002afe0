pub mod elasticache;

pub use elasticache::{ElastiCacheApi, ElastiCacheService};
