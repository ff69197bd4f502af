//! External adapter for DODatabaseCluster resources
//!
//! [`DatabaseConnector`] resolves credentials and builds a
//! [`DatabaseExternal`] per reconcile. The adapter translates the four
//! lifecycle verbs into DigitalOcean API calls and keeps the resource's
//! observation and Ready condition in sync with the remote cluster.

use async_trait::async_trait;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::clients::database::{
    generate_connection_details, generate_database, generate_observation, late_initialize_spec,
};
use crate::clients::digitalocean::{Database, DatabasesApi, DigitalOceanClient};
use crate::clients::auth;
use crate::crd::{
    ConditionReason, DODatabaseCluster, STATUS_CREATING, STATUS_FORKING, STATUS_MIGRATING,
    STATUS_ONLINE, STATUS_RESIZING,
};
use crate::error::{
    ERR_DB_CREATE_FAILED, ERR_DB_DELETE_FAILED, ERR_DB_UPDATE, ERR_GET_DB,
};
use crate::managed::{
    ConnectionDetails, ExternalClient, ExternalConnecter, ExternalCreation, ExternalObservation,
    ExternalUpdate, Managed,
};
use crate::metrics::record_external_operation;
use crate::{Error, Result};

/// Persists spec changes made by late initialization
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Replace the stored object, returning the server's copy
    async fn update(&self, cluster: &DODatabaseCluster) -> Result<DODatabaseCluster>;
}

/// [`ResourceStore`] backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn update(&self, cluster: &DODatabaseCluster) -> Result<DODatabaseCluster> {
        let clusters: Api<DODatabaseCluster> = Api::all(self.client.clone());
        clusters
            .replace(&cluster.name_any(), &PostParams::default(), cluster)
            .await
            .map_err(|e| Error::KubeError(e.to_string()))
    }
}

/// Builds an authenticated [`DatabaseExternal`] for each reconcile
pub struct DatabaseConnector {
    client: Client,
    api_url: String,
}

impl DatabaseConnector {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl ExternalConnecter for DatabaseConnector {
    async fn connect(&self, mg: &dyn Managed) -> Result<Box<dyn ExternalClient>> {
        let token = auth::get_auth_info(&self.client, mg.provider_config_name()).await?;
        let databases = DigitalOceanClient::new(self.api_url.as_str(), token)
            .map_err(|e| Error::AuthError(format!("cannot build DigitalOcean client: {}", e)))?;

        Ok(Box::new(DatabaseExternal::new(
            Arc::new(databases),
            Arc::new(KubeStore::new(self.client.clone())),
        )))
    }
}

/// Lifecycle adapter between DODatabaseCluster and the DigitalOcean API
pub struct DatabaseExternal {
    databases: Arc<dyn DatabasesApi>,
    kube: Arc<dyn ResourceStore>,
}

impl DatabaseExternal {
    pub fn new(databases: Arc<dyn DatabasesApi>, kube: Arc<dyn ResourceStore>) -> Self {
        Self { databases, kube }
    }

    /// Connection details for a freshly created cluster.
    ///
    /// The create response may not carry credentials yet; fall back to a
    /// fetch and publish nothing if that fails.
    async fn connection_details(&self, db: &Database) -> ConnectionDetails {
        if db.connection.is_some() {
            return generate_connection_details(db);
        }

        match self.databases.get(&db.id).await {
            Ok(fetched) => generate_connection_details(&fetched),
            Err(e) => {
                warn!("Cannot fetch connection details for {}: {}", db.id, e);
                ConnectionDetails::new()
            }
        }
    }
}

fn as_cluster(mg: &mut dyn Managed) -> Result<&mut DODatabaseCluster> {
    mg.as_any_mut()
        .downcast_mut::<DODatabaseCluster>()
        .ok_or(Error::WrongResourceKind)
}

#[async_trait]
impl ExternalClient for DatabaseExternal {
    async fn observe(&self, mg: &mut dyn Managed) -> Result<ExternalObservation> {
        let cr = as_cluster(mg)?;

        let external_name = cr.external_name().to_string();
        if external_name.is_empty() {
            return Ok(ExternalObservation::default());
        }

        let observed = match self.databases.get(&external_name).await {
            Ok(db) => {
                record_external_operation("get", true);
                db
            }
            Err(e) if e.is_not_found() => {
                record_external_operation("get", true);
                debug!("Database cluster {} not found", external_name);
                return Ok(ExternalObservation::default());
            }
            Err(e) => {
                record_external_operation("get", false);
                return Err(Error::remote(ERR_GET_DB, e));
            }
        };

        let current = cr.spec.for_provider.clone();
        late_initialize_spec(&mut cr.spec.for_provider, &observed);
        if current != cr.spec.for_provider {
            info!("Late-initialized spec of {}", cr.name_any());
            let stored = self
                .kube
                .update(cr)
                .await
                .map_err(|e| Error::KubeError(format!("{}: {}", ERR_DB_UPDATE, e)))?;
            cr.metadata = stored.metadata;
        }

        cr.status.get_or_insert_with(Default::default).at_provider = generate_observation(&observed);
        set_provider_status(cr);

        // Spec drift is not compared; updates are unsupported.
        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: true,
            connection_details: ConnectionDetails::new(),
        })
    }

    async fn create(&self, mg: &mut dyn Managed) -> Result<ExternalCreation> {
        let cr = as_cluster(mg)?;

        cr.set_condition(ConditionReason::Creating.condition());

        let name = match cr.external_name() {
            "" => cr.metadata.name.clone().unwrap_or_default(),
            external => external.to_string(),
        };
        if name.is_empty() {
            return Err(Error::NameRequired);
        }

        let request = generate_database(&name, &cr.spec.for_provider);

        let db = match self.databases.create(&request).await {
            Ok(Some(db)) => db,
            Ok(None) => {
                record_external_operation("create", false);
                return Err(Error::EmptyResponse(ERR_DB_CREATE_FAILED));
            }
            Err(e) => {
                record_external_operation("create", false);
                return Err(Error::remote(ERR_DB_CREATE_FAILED, e));
            }
        };
        record_external_operation("create", true);

        info!("Created database cluster {} with id {}", name, db.id);
        cr.set_external_name(db.id.as_str());

        let mut creation = ExternalCreation::default();
        if cr.spec.write_connection_secret_to_reference.is_some() {
            creation.connection_details = self.connection_details(&db).await;
        }

        Ok(creation)
    }

    async fn update(&self, _mg: &mut dyn Managed) -> Result<ExternalUpdate> {
        // Database clusters cannot be reconfigured through this controller.
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut dyn Managed) -> Result<()> {
        let cr = as_cluster(mg)?;

        cr.set_condition(ConditionReason::Deleting.condition());

        let external_name = cr.external_name().to_string();
        if external_name.is_empty() {
            debug!("{} was never created, nothing to delete", cr.name_any());
            return Ok(());
        }

        match self.databases.delete(&external_name).await {
            Ok(()) => {
                record_external_operation("delete", true);
                info!("Deleted database cluster {}", external_name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                record_external_operation("delete", true);
                Ok(())
            }
            Err(e) => {
                record_external_operation("delete", false);
                Err(Error::remote(ERR_DB_DELETE_FAILED, e))
            }
        }
    }
}

/// Map a remote lifecycle status to a Ready condition reason.
///
/// `None` leaves the current condition untouched.
pub fn condition_for_status(status: &str) -> Option<ConditionReason> {
    match status {
        STATUS_CREATING => Some(ConditionReason::Creating),
        STATUS_ONLINE => Some(ConditionReason::Available),
        STATUS_MIGRATING | STATUS_RESIZING => None,
        STATUS_FORKING => Some(ConditionReason::Unavailable),
        _ => None,
    }
}

/// Set the Ready condition from the observed remote status
pub fn set_provider_status(cr: &mut DODatabaseCluster) {
    let reason = cr
        .status
        .as_ref()
        .and_then(|s| s.at_provider.status.as_deref())
        .and_then(condition_for_status);

    if let Some(reason) = reason {
        cr.set_condition(reason.condition());
    }
}
