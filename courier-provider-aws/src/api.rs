//! Remote API seam for topic rule destinations
//!
//! `DestinationApi` is the narrow set of IoT calls the provider makes. The
//! production implementation is `aws_sdk_iot::Client`; tests substitute an
//! in-memory fake.

use async_trait::async_trait;
use aws_sdk_iot::Client as IotClient;
use aws_sdk_iot::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iot::types::{TopicRuleDestination, TopicRuleDestinationConfiguration};
use courier_core::provider::{ProviderError, ProviderResult};
use log::debug;

/// Error code returned by IoT when the destination does not exist
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Create a destination, returning it as acknowledged by the service
    async fn create_destination(
        &self,
        config: TopicRuleDestinationConfiguration,
    ) -> ProviderResult<TopicRuleDestination>;

    /// Get a destination by ARN; `None` if it does not exist
    async fn get_destination(&self, arn: &str) -> ProviderResult<Option<TopicRuleDestination>>;

    /// Delete a destination by ARN
    async fn delete_destination(&self, arn: &str) -> ProviderResult<()>;
}

#[async_trait]
impl DestinationApi for IotClient {
    async fn create_destination(
        &self,
        config: TopicRuleDestinationConfiguration,
    ) -> ProviderResult<TopicRuleDestination> {
        let output = self
            .create_topic_rule_destination()
            .destination_configuration(config)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to create IoT Topic Rule Destination: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        output.topic_rule_destination().cloned().ok_or_else(|| {
            ProviderError::new("IoT Topic Rule Destination created but not returned")
        })
    }

    async fn get_destination(&self, arn: &str) -> ProviderResult<Option<TopicRuleDestination>> {
        match self.get_topic_rule_destination().arn(arn).send().await {
            Ok(output) => Ok(output.topic_rule_destination().cloned()),
            Err(e) if is_not_found(&e) => {
                debug!("IoT Topic Rule Destination {} not found", arn);
                Ok(None)
            }
            Err(e) => Err(ProviderError::new(format!(
                "Failed to get IoT Topic Rule Destination {}: {}",
                arn,
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn delete_destination(&self, arn: &str) -> ProviderResult<()> {
        self.delete_topic_rule_destination()
            .arn(arn)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to delete IoT Topic Rule Destination {}: {}",
                    arn,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}

fn is_not_found<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    err.as_service_error().and_then(|e| e.code()) == Some(NOT_FOUND_CODE)
}
