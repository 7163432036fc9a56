//! Courier AWS IoT Provider
//!
//! Manages AWS IoT topic rule destinations.
//!
//! ## Module Structure
//!
//! - `api` - Narrow IoT API seam (`DestinationApi`)
//! - `config` - Provider settings (region, create timeout, polling)
//! - `convert` - Expand/flatten between DSL values and IoT types
//! - `provider` - IotProvider implementation
//! - `resources` - Resource type definitions
//! - `schemas` - Resource schemas
//! - `utils` - Region and ARN helpers

pub mod api;
pub mod config;
pub mod convert;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod utils;

// Re-export main types
pub use api::DestinationApi;
pub use config::{ConfigError, ProviderConfig};
pub use provider::IotProvider;
pub use utils::normalize_region;

use courier_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use courier_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl<C: DestinationApi> Provider for IotProvider<C> {
    fn name(&self) -> &'static str {
        "iot"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            self.read_resource(&id.resource_type, &id.name, identifier.as_deref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}
