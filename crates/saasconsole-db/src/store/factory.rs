#[cfg(feature = "store-dynamodb")]
use super::dynamo::{DynamoStore, DynamoStoreConfig};
use super::memory::MemoryStore;
use super::{ItemStore, StoreResult};
#[cfg(not(feature = "store-dynamodb"))]
use super::StoreError;
use saasconsole_core::{Config, StoreBackend};
use std::sync::Arc;

/// Create the store backend selected by configuration
pub async fn create_store(config: &Config) -> StoreResult<Arc<dyn ItemStore>> {
    match config.store_backend() {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }

        #[cfg(feature = "store-dynamodb")]
        StoreBackend::DynamoDb => {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = config.aws_region() {
                loader = loader.region(aws_config::Region::new(region.to_string()));
            }
            let sdk_config = loader.load().await;

            let store = DynamoStore::new(
                &sdk_config,
                DynamoStoreConfig {
                    table_name: config.dynamodb_table().to_string(),
                    region: config.aws_region().map(String::from),
                    endpoint: config.dynamodb_endpoint().map(String::from),
                    timeout_ms: Some(config.store_timeout_ms()),
                },
            );

            // Local endpoints start empty
            if config.dynamodb_endpoint().is_some() {
                store.ensure_table().await?;
            }

            tracing::info!(table = %config.dynamodb_table(), "DynamoDB store initialized");
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "store-dynamodb"))]
        StoreBackend::DynamoDb => Err(StoreError::ConfigError(
            "DynamoDB backend not available (store-dynamodb feature not enabled)".to_string(),
        )),
    }
}
