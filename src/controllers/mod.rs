//! Controller implementations for watching and reconciling resources

pub mod database_controller;

use kube::Client;
use std::sync::Arc;

use crate::config::OperatorConfig;
use crate::managed::ExternalConnecter;
use crate::reconcilers::database::DatabaseConnector;

/// Shared context for controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Process configuration
    pub config: OperatorConfig,
    /// Builds authenticated adapters per reconcile
    pub connector: Arc<dyn ExternalConnecter>,
}

impl Context {
    /// Create a new context using the DigitalOcean connector
    pub fn new(client: Client, config: OperatorConfig) -> Arc<Self> {
        let connector = Arc::new(DatabaseConnector::new(client.clone(), config.api_url.clone()));
        Arc::new(Self {
            client,
            config,
            connector,
        })
    }
}
