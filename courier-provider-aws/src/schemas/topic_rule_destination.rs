//! IoT topic rule destination schema definition
//!
//! Based on the AWS IoT CreateTopicRuleDestination API:
//! https://docs.aws.amazon.com/iot/latest/apireference/API_CreateTopicRuleDestination.html

use courier_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types::{https_url, iam_role_arn};

/// DSL resource type name
pub const RESOURCE_TYPE: &str = "iot.topic_rule_destination";

/// `http` block: an HTTP endpoint that must confirm ownership of its URL
pub fn http_block() -> AttributeType {
    AttributeType::Block {
        name: "http".to_string(),
        attributes: vec![
            AttributeSchema::new("confirmation_url", https_url())
                .required()
                .with_description(
                    "URL AWS IoT uses to confirm ownership of or access to the destination",
                )
                .with_provider_name("ConfirmationUrl"),
        ],
    }
}

/// `vpc` block: a target inside a VPC, reached through an IAM role
pub fn vpc_block() -> AttributeType {
    AttributeType::Block {
        name: "vpc".to_string(),
        attributes: vec![
            AttributeSchema::new("role_arn", iam_role_arn())
                .required()
                .with_description("IAM role that grants permission to create ENIs in the VPC")
                .with_provider_name("RoleArn"),
            AttributeSchema::new("security_groups", types::string_list())
                .with_description("Security groups of the VPC destination")
                .with_provider_name("SecurityGroups"),
            AttributeSchema::new("subnet_ids", types::string_list())
                .required()
                .with_description("Subnets of the VPC destination")
                .with_provider_name("SubnetIds"),
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_description("ID of the VPC")
                .with_provider_name("VpcId"),
        ],
    }
}

/// Returns the schema for IoT topic rule destinations
///
/// Every configurable attribute forces replacement: the remote API has no
/// way to change a destination's configuration after creation.
pub fn topic_rule_destination_schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Destination where IoT topic rule actions deliver messages")
        .attribute(
            AttributeSchema::new("http", http_block())
                .force_new()
                .with_description("HTTP endpoint configuration")
                .with_provider_name("HttpUrlConfiguration"),
        )
        .attribute(
            AttributeSchema::new("vpc", vpc_block())
                .force_new()
                .with_description("VPC configuration")
                .with_provider_name("VpcConfiguration"),
        )
        .attribute(
            AttributeSchema::new("arn", AttributeType::String)
                .computed()
                .with_description("ARN of the destination (read-only)")
                .with_provider_name("Arn"),
        )
        .attribute(
            AttributeSchema::new("status", AttributeType::String)
                .computed()
                .with_description("Status of the destination (read-only)")
                .with_provider_name("Status"),
        )
        .with_exactly_one_of(&["http", "vpc"])
}
