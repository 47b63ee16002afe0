use anyhow::Result;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::aws_services::{ElastiCacheApi, ElastiCacheService};

/// Builds one ElastiCache client per region.
///
/// Every region task asks for its own client so that tasks never share a connection pool.
#[async_trait]
pub trait ElastiCacheClientFactory: Send + Sync {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn ElastiCacheApi>>;
}

/// Connection settings shared by every client the factory builds
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub profile: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(60),
        }
    }
}

/// Factory resolving credentials from a named AWS profile
#[derive(Debug, Clone)]
pub struct SdkClientFactory {
    settings: ClientSettings,
}

impl SdkClientFactory {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub async fn create_aws_config_for_region(&self, region: &str) -> aws_config::SdkConfig {
        debug!(
            "Creating AWS config for profile {} in region {}",
            self.settings.profile, region
        );

        let timeouts = TimeoutConfig::builder()
            .connect_timeout(self.settings.connect_timeout)
            .operation_timeout(self.settings.operation_timeout)
            .build();

        // Retries happen per call site through retry::with_retry
        aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&self.settings.profile)
            .region(Region::new(region.to_string()))
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .load()
            .await
    }
}

#[async_trait]
impl ElastiCacheClientFactory for SdkClientFactory {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn ElastiCacheApi>> {
        let aws_config = self.create_aws_config_for_region(region).await;
        Ok(Arc::new(ElastiCacheService::new(&aws_config, region)))
    }
}
