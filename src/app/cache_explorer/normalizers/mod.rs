pub mod elasticache;
