//! AWS IoT Provider implementation
//!
//! This module contains the provider that manages IoT topic rule
//! destinations through the [`DestinationApi`] seam.

use aws_config::Region;
use aws_sdk_iot::Client as IotClient;
use aws_sdk_iot::types::{TopicRuleDestination, TopicRuleDestinationStatus};
use courier_core::provider::{ProviderError, ProviderResult};
use courier_core::resource::{Resource, ResourceId, State};
use courier_core::waiter::StatusWaiter;
use log::{debug, info, warn};

use crate::api::DestinationApi;
use crate::config::ProviderConfig;
use crate::convert::{expand_destination_configuration, flatten_destination};
use crate::schemas::topic_rule_destination::{RESOURCE_TYPE, topic_rule_destination_schema};

/// AWS IoT Provider
pub struct IotProvider<C = IotClient> {
    client: C,
    config: ProviderConfig,
}

impl IotProvider<IotClient> {
    /// Create a new IotProvider using the default AWS credential chain
    pub async fn new(config: ProviderConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        Self {
            client: IotClient::new(&sdk_config),
            config,
        }
    }
}

impl<C: DestinationApi> IotProvider<C> {
    /// Create with a specific client (for testing)
    pub fn with_client(client: C, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by type
    pub async fn read_resource(
        &self,
        resource_type: &str,
        name: &str,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        match resource_type {
            RESOURCE_TYPE => self.read_topic_rule_destination(name, identifier).await,
            _ => Err(unknown_resource_type(ResourceId::new(resource_type, name))),
        }
    }

    /// Create a resource by type
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            RESOURCE_TYPE => self.create_topic_rule_destination(resource).await,
            _ => Err(unknown_resource_type(resource.id)),
        }
    }

    /// Delete a resource by type
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            RESOURCE_TYPE => self.delete_topic_rule_destination(id, identifier).await,
            _ => Err(unknown_resource_type(id.clone())),
        }
    }

    // =========================================================================
    // Topic Rule Destination
    // =========================================================================

    /// Read a topic rule destination by ARN
    pub async fn read_topic_rule_destination(
        &self,
        name: &str,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let id = ResourceId::new(RESOURCE_TYPE, name);

        let arn = match identifier {
            Some(arn) => arn,
            None => return Ok(State::not_found(id)),
        };

        let destination = match self
            .client
            .get_destination(arn)
            .await
            .map_err(|e| e.for_resource(id.clone()))?
        {
            Some(destination) => destination,
            None => return Ok(State::not_found(id)),
        };

        let attributes = flatten_destination(&destination);
        let identifier = destination.arn().unwrap_or(arn).to_string();

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    /// Create a topic rule destination and wait until it is ENABLED
    pub async fn create_topic_rule_destination(&self, resource: Resource) -> ProviderResult<State> {
        if let Err(errors) = topic_rule_destination_schema().validate(&resource.attributes) {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(ProviderError::new(format!(
                "Invalid configuration: {}",
                messages.join("; ")
            ))
            .for_resource(resource.id));
        }

        let config = expand_destination_configuration(&resource.attributes)
            .map_err(|e| e.for_resource(resource.id.clone()))?;

        info!("Creating IoT Topic Rule Destination {}", resource.id);
        let created = self
            .client
            .create_destination(config)
            .await
            .map_err(|e| e.for_resource(resource.id.clone()))?;

        let arn = created
            .arn()
            .ok_or_else(|| {
                ProviderError::new("IoT Topic Rule Destination created but no ARN returned")
                    .for_resource(resource.id.clone())
            })?
            .to_string();

        info!("Created {}, waiting for it to become ENABLED", arn);
        if let Err(err) = self.wait_for_enabled(&arn).await {
            let reason = self.status_reason(&arn).await;
            warn!("{} did not become ENABLED: {}", arn, err);
            let message = match reason {
                Some(reason) => format!(
                    "IoT Topic Rule Destination {} did not become ENABLED: {} (reason: {})",
                    arn, err, reason
                ),
                None => format!(
                    "IoT Topic Rule Destination {} did not become ENABLED: {}",
                    arn, err
                ),
            };
            return Err(ProviderError::new(message)
                .with_cause(err)
                .for_resource(resource.id));
        }

        self.read_topic_rule_destination(&resource.id.name, Some(&arn))
            .await
    }

    /// Delete a topic rule destination by ARN
    pub async fn delete_topic_rule_destination(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        info!("Deleting IoT Topic Rule Destination {}", identifier);
        self.client
            .delete_destination(identifier)
            .await
            .map_err(|e| e.for_resource(id.clone()))
    }

    /// Wait for a destination to leave IN_PROGRESS and reach ENABLED
    async fn wait_for_enabled(&self, arn: &str) -> ProviderResult<TopicRuleDestination> {
        let waiter = StatusWaiter::new(
            &[TopicRuleDestinationStatus::InProgress.as_str()],
            &[TopicRuleDestinationStatus::Enabled.as_str()],
            self.config.create_timeout,
        )
        .with_intervals(self.config.poll_interval, self.config.max_poll_interval);

        let client = &self.client;
        let destination = waiter
            .wait(move || async move {
                let Some(destination) = client.get_destination(arn).await? else {
                    return Ok(None);
                };
                // Without a status the destination is not settled yet
                let Some(status) = destination.status().map(|s| s.as_str().to_string()) else {
                    debug!("{} returned no status", arn);
                    return Ok(None);
                };
                Ok(Some((destination, status)))
            })
            .await?;

        Ok(destination)
    }

    /// Best-effort lookup of why a destination is not usable
    async fn status_reason(&self, arn: &str) -> Option<String> {
        match self.client.get_destination(arn).await {
            Ok(destination) => destination
                .and_then(|d| d.status_reason().map(|s| s.to_string()))
                .filter(|s| !s.is_empty()),
            Err(e) => {
                debug!("Failed to fetch status reason for {}: {}", arn, e);
                None
            }
        }
    }
}

fn unknown_resource_type(id: ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type)).for_resource(id)
}
