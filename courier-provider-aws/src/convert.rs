//! Expand / flatten between DSL values and IoT API structures
//!
//! Expand turns configuration blocks into request structures; flatten turns
//! response structures back into configuration-shaped values.

use std::collections::HashMap;

use aws_sdk_iot::types::{
    HttpUrlDestinationConfiguration, HttpUrlDestinationProperties, TopicRuleDestination,
    TopicRuleDestinationConfiguration, VpcDestinationConfiguration, VpcDestinationProperties,
};
use courier_core::provider::{ProviderError, ProviderResult};
use courier_core::resource::Value;

/// Build the create request configuration from resource attributes
pub fn expand_destination_configuration(
    attributes: &HashMap<String, Value>,
) -> ProviderResult<TopicRuleDestinationConfiguration> {
    let mut config = TopicRuleDestinationConfiguration::builder();

    if let Some(block) = attributes.get("http").and_then(Value::as_block) {
        config = config.http_url_configuration(expand_http_url_configuration(block)?);
    }

    if let Some(block) = attributes.get("vpc").and_then(Value::as_block) {
        config = config.vpc_configuration(expand_vpc_configuration(block)?);
    }

    Ok(config.build())
}

pub fn expand_http_url_configuration(
    block: &HashMap<String, Value>,
) -> ProviderResult<HttpUrlDestinationConfiguration> {
    HttpUrlDestinationConfiguration::builder()
        .set_confirmation_url(string_field(block, "http", "confirmation_url")?)
        .build()
        .map_err(|e| ProviderError::new(format!("Invalid http configuration: {}", e)).with_cause(e))
}

pub fn expand_vpc_configuration(
    block: &HashMap<String, Value>,
) -> ProviderResult<VpcDestinationConfiguration> {
    // An empty list is sent as "no security groups"
    let security_groups = string_list_field(block, "vpc", "security_groups")?
        .filter(|groups| !groups.is_empty());

    VpcDestinationConfiguration::builder()
        .set_role_arn(string_field(block, "vpc", "role_arn")?)
        .set_security_groups(security_groups)
        .set_subnet_ids(string_list_field(block, "vpc", "subnet_ids")?)
        .set_vpc_id(string_field(block, "vpc", "vpc_id")?)
        .build()
        .map_err(|e| ProviderError::new(format!("Invalid vpc configuration: {}", e)).with_cause(e))
}

pub fn flatten_http_url_properties(props: &HttpUrlDestinationProperties) -> Value {
    let mut fields = HashMap::new();
    if let Some(url) = props.confirmation_url() {
        fields.insert(
            "confirmation_url".to_string(),
            Value::String(url.to_string()),
        );
    }
    Value::block(fields)
}

pub fn flatten_vpc_properties(props: &VpcDestinationProperties) -> Value {
    let mut fields = HashMap::new();
    if let Some(role_arn) = props.role_arn() {
        fields.insert("role_arn".to_string(), Value::String(role_arn.to_string()));
    }
    if !props.security_groups().is_empty() {
        fields.insert(
            "security_groups".to_string(),
            string_list(props.security_groups()),
        );
    }
    fields.insert("subnet_ids".to_string(), string_list(props.subnet_ids()));
    if let Some(vpc_id) = props.vpc_id() {
        fields.insert("vpc_id".to_string(), Value::String(vpc_id.to_string()));
    }
    Value::block(fields)
}

/// Attributes observed on a remote destination
pub fn flatten_destination(destination: &TopicRuleDestination) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();

    if let Some(arn) = destination.arn() {
        attributes.insert("arn".to_string(), Value::String(arn.to_string()));
    }
    if let Some(status) = destination.status() {
        attributes.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
    }
    if let Some(http) = destination.http_url_properties() {
        attributes.insert("http".to_string(), flatten_http_url_properties(http));
    }
    if let Some(vpc) = destination.vpc_properties() {
        attributes.insert("vpc".to_string(), flatten_vpc_properties(vpc));
    }

    attributes
}

fn string_list(items: &[String]) -> Value {
    Value::List(items.iter().cloned().map(Value::String).collect())
}

fn string_field(
    block: &HashMap<String, Value>,
    block_name: &str,
    key: &str,
) -> ProviderResult<Option<String>> {
    match block.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProviderError::new(format!(
            "{}.{} must be a string",
            block_name, key
        ))),
    }
}

fn string_list_field(
    block: &HashMap<String, Value>,
    block_name: &str,
    key: &str,
) -> ProviderResult<Option<Vec<String>>> {
    match block.get(key) {
        None => Ok(None),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ProviderError::new(format!(
                    "{}.{} must contain only strings",
                    block_name, key
                ))),
            })
            .collect::<ProviderResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(ProviderError::new(format!(
            "{}.{} must be a list of strings",
            block_name, key
        ))),
    }
}
