//! ElastiCache discovery across the regions of a Global Datastore.

pub mod aws_client;
pub mod aws_services;
pub mod cache;
pub mod credentials;
pub mod filters;
pub mod normalizers;
pub mod region_worker;
pub mod retry;
pub mod sdk_errors;
pub mod state;
pub mod status;
pub mod topology;

pub use aws_client::{CoordinatorConfig, QueryCoordinator, QueryReport, RegionFailure};
pub use aws_services::{ElastiCacheApi, ElastiCacheService};
pub use cache::{ParameterCache, ParameterCacheStats, ParameterValues};
pub use credentials::{ClientSettings, ElastiCacheClientFactory, SdkClientFactory};
pub use filters::NamePattern;
pub use region_worker::RegionQueryWorker;
pub use retry::RetryPolicy;
pub use state::{
    Attribute, BackupSettings, CacheClusterRecord, Engine, EngineFilter, GlobalMembership,
    MemberRole, ResourceKind, SlowLogSettings,
};
pub use status::{NoopProgress, ProgressHandle, ProgressSink, StatusChannel, StatusState};
pub use topology::{derive_region_set, TopologyDiscoverer, TopologyEntry, TopologyIndex};
