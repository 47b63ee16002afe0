//! aws-ec-info: inventory of AWS ElastiCache clusters across the regions of a Global Datastore.
//!
//! A query starts in one region, reads the Global Datastore topology there, and then
//! queries every region that holds a member concurrently. Results are merged into one
//! list of [`app::cache_explorer::CacheClusterRecord`]s sorted by region.
//!
//! ```no_run
//! use std::sync::Arc;
//! use aws_ec_info::app::cache_explorer::{
//!     ClientSettings, CoordinatorConfig, EngineFilter, NoopProgress, QueryCoordinator,
//!     SdkClientFactory,
//! };
//!
//! # async fn example() -> Result<(), aws_ec_info::app::error::EcInfoError> {
//! let coordinator = QueryCoordinator::new(
//!     Arc::new(SdkClientFactory::new(ClientSettings::default())),
//!     Arc::new(NoopProgress),
//!     CoordinatorConfig::default(),
//! );
//! let records = coordinator.run("us-east-1", &EngineFilter::all(), None).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
