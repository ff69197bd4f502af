//! Managed resource lifecycle contract
//!
//! The controller drives every managed resource through the same four
//! verbs. An [`ExternalConnecter`] produces an [`ExternalClient`] bound to
//! credentials; the client then observes, creates, updates or deletes the
//! remote counterpart of a [`Managed`] resource.

use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;

use crate::Result;

/// Key/value pairs published to a connection Secret
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// A Kubernetes object that represents an external resource.
///
/// Adapters receive resources through this trait and downcast to the
/// concrete kind they manage.
pub trait Managed: Send + Sync + 'static {
    /// Name of the ProviderConfig holding credentials
    fn provider_config_name(&self) -> &str;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Result of observing an external resource
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalObservation {
    /// The remote resource exists
    pub resource_exists: bool,
    /// The remote resource matches the desired state
    pub resource_up_to_date: bool,
    /// Details to publish alongside the observation
    pub connection_details: ConnectionDetails,
}

/// Result of creating an external resource
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

/// Result of updating an external resource
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Lifecycle operations against one kind of external resource
#[async_trait]
pub trait ExternalClient: Send + Sync {
    async fn observe(&self, mg: &mut dyn Managed) -> Result<ExternalObservation>;

    async fn create(&self, mg: &mut dyn Managed) -> Result<ExternalCreation>;

    async fn update(&self, mg: &mut dyn Managed) -> Result<ExternalUpdate>;

    async fn delete(&self, mg: &mut dyn Managed) -> Result<()>;
}

/// Produces an authenticated [`ExternalClient`] for a resource
#[async_trait]
pub trait ExternalConnecter: Send + Sync {
    async fn connect(&self, mg: &dyn Managed) -> Result<Box<dyn ExternalClient>>;
}
