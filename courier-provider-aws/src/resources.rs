//! Resource type definitions
//!
//! Maps each DSL resource type to the schema the provider validates it with.

use courier_core::provider::ResourceType;
use courier_core::schema::ResourceSchema;

use crate::schemas::topic_rule_destination::{RESOURCE_TYPE, topic_rule_destination_schema};

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    TopicRuleDestinationType,
    RESOURCE_TYPE,
    topic_rule_destination_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(TopicRuleDestinationType)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_rule_destination_is_registered() {
        let types = resource_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name(), "iot.topic_rule_destination");
        assert_eq!(types[0].schema().resource_type, "iot.topic_rule_destination");
    }
}
