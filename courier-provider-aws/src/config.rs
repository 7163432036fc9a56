//! Provider configuration
//!
//! Built from the provider block the host hands over (an attribute map),
//! validated against [`provider_schema`].

use std::collections::HashMap;
use std::time::Duration;

use courier_core::provider::ProviderError;
use courier_core::resource::Value;
use courier_core::schema::{AttributeSchema, ResourceSchema, TypeError, types};

use crate::schemas::types::aws_region;
use crate::utils::normalize_region;

/// Errors raised while reading the provider configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid provider configuration: {}", errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid { errors: Vec<TypeError> },
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

/// Schema of the provider block
pub fn provider_schema() -> ResourceSchema {
    ResourceSchema::new("provider.iot")
        .with_description("AWS IoT provider settings")
        .attribute(
            AttributeSchema::new("region", aws_region())
                .required()
                .with_description("AWS region the destinations live in"),
        )
        .attribute(
            AttributeSchema::new("create_timeout", types::positive_int())
                .with_description("Seconds to wait for a new destination to become ENABLED")
                .with_default(Value::Int(300)),
        )
        .attribute(
            AttributeSchema::new("poll_interval", types::positive_int())
                .with_description("Initial seconds between status polls")
                .with_default(Value::Int(1)),
        )
        .attribute(
            AttributeSchema::new("max_poll_interval", types::positive_int())
                .with_description("Upper bound in seconds between status polls")
                .with_default(Value::Int(10)),
        )
}

/// Settings of an IotProvider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// AWS region in API format (e.g., "us-east-1")
    pub region: String,
    /// Bound on the wait for a created destination to become ENABLED
    pub create_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl ProviderConfig {
    pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new(region: &str) -> Self {
        Self {
            region: normalize_region(region),
            create_timeout: Self::DEFAULT_CREATE_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            max_poll_interval: Self::DEFAULT_MAX_POLL_INTERVAL,
        }
    }

    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    pub fn with_poll_intervals(mut self, min: Duration, max: Duration) -> Self {
        self.poll_interval = min;
        self.max_poll_interval = max;
        self
    }

    /// Build from a provider block
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        provider_schema()
            .validate(attributes)
            .map_err(|errors| ConfigError::Invalid { errors })?;

        let region = get_string(attributes, "region").ok_or_else(|| ConfigError::Invalid {
            errors: vec![TypeError::MissingRequired {
                name: "region".to_string(),
            }],
        })?;

        let mut config = Self::new(region);
        if let Some(secs) = get_secs(attributes, "create_timeout") {
            config.create_timeout = secs;
        }
        if let Some(secs) = get_secs(attributes, "poll_interval") {
            config.poll_interval = secs;
        }
        if let Some(secs) = get_secs(attributes, "max_poll_interval") {
            config.max_poll_interval = secs;
        }
        Ok(config)
    }
}

fn get_string<'a>(attributes: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

fn get_secs(attributes: &HashMap<String, Value>, key: &str) -> Option<Duration> {
    match attributes.get(key) {
        Some(Value::Int(n)) if *n > 0 => Some(Duration::from_secs(*n as u64)),
        _ => None,
    }
}
