//! IoT resource schema definitions

pub mod topic_rule_destination;
pub mod types;

use courier_core::schema::ResourceSchema;

/// Returns all IoT schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![topic_rule_destination::topic_rule_destination_schema()]
}
