//! Controller for DODatabaseCluster resources

use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Event},
        watcher::Config,
    },
    Api, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::secrets;
use crate::controllers::Context;
use crate::crd::{ConditionReason, DODatabaseCluster, DeletionPolicy, EXTERNAL_NAME_ANNOTATION};
use crate::managed::ConnectionDetails;
use crate::metrics::prometheus::{
    CLUSTER_AVAILABLE, RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS,
};
use crate::Error;

/// Finalizer name for cleanup
pub const FINALIZER: &str = "database.do.crossplane.io/finalizer";

/// Requeue interval while a cluster is still provisioning
const CREATING_REQUEUE: Duration = Duration::from_secs(15);

/// Attempts at recording the external name of a freshly created cluster
const EXTERNAL_NAME_ATTEMPTS: u32 = 3;
const EXTERNAL_NAME_BACKOFF: Duration = Duration::from_millis(500);

const KIND: &str = "DODatabaseCluster";

/// Run the database cluster controller
pub async fn run(ctx: Arc<Context>) {
    let clusters: Api<DODatabaseCluster> = Api::all(ctx.client.clone());

    info!("Starting DODatabaseCluster controller");

    Controller::new(clusters, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    info!("DODatabaseCluster controller stopped");
}

/// Reconcile a DODatabaseCluster resource
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any()))]
async fn reconcile(cluster: Arc<DODatabaseCluster>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = std::time::Instant::now();
    let name = cluster.name_any();

    RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let clusters: Api<DODatabaseCluster> = Api::all(ctx.client.clone());

    let result = finalizer(&clusters, FINALIZER, cluster, |event| async {
        match event {
            Event::Apply(cluster) => apply(&cluster, &ctx).await,
            Event::Cleanup(cluster) => cleanup(&cluster, &ctx).await,
        }
    })
    .await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION.with_label_values(&[KIND]).observe(duration);

    match &result {
        Ok(_) => info!("Successfully reconciled {} in {:.2}s", name, duration),
        Err(e) => {
            RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
            error!("Failed to reconcile {}: {:?}", name, e);
        }
    }

    Ok(result?)
}

/// Drive the remote cluster towards the desired state
async fn apply(cluster: &DODatabaseCluster, ctx: &Context) -> Result<Action, Error> {
    let mut cr = cluster.clone();
    let name = cr.name_any();

    let external = ctx.connector.connect(&cr).await?;
    let observation = external.observe(&mut cr).await?;

    if !observation.resource_exists {
        info!("Creating database cluster for {}", name);

        let creation = external.create(&mut cr).await;
        if !cr.external_name().is_empty() {
            let persisted = retry(EXTERNAL_NAME_ATTEMPTS, EXTERNAL_NAME_BACKOFF, || {
                persist_external_name(&cr, ctx)
            })
            .await;
            if let Err(e) = persisted {
                error!(
                    external_name = %cr.external_name(),
                    "Created database cluster for {} but could not record its external name: {}",
                    name, e
                );
                return Err(e);
            }
        }
        patch_status(&cr, ctx).await?;
        let creation = creation?;

        publish_connection_details(&cr, &creation.connection_details, ctx).await?;
        return Ok(Action::requeue(CREATING_REQUEUE));
    }

    if !observation.resource_up_to_date {
        let update = external.update(&mut cr).await?;
        publish_connection_details(&cr, &update.connection_details, ctx).await?;
    }

    publish_connection_details(&cr, &observation.connection_details, ctx).await?;
    patch_status(&cr, ctx).await?;

    let reason = cr.status.as_ref().and_then(|s| s.ready_reason());
    CLUSTER_AVAILABLE
        .with_label_values(&[name.as_str()])
        .set(if reason == Some(ConditionReason::Available) { 1.0 } else { 0.0 });

    if reason == Some(ConditionReason::Creating) {
        Ok(Action::requeue(CREATING_REQUEUE))
    } else {
        Ok(Action::requeue(ctx.config.reconcile_interval))
    }
}

/// Delete the remote cluster when the resource goes away
async fn cleanup(cluster: &DODatabaseCluster, ctx: &Context) -> Result<Action, Error> {
    let name = cluster.name_any();
    if let Err(e) = CLUSTER_AVAILABLE.remove_label_values(&[name.as_str()]) {
        debug!("No availability gauge to remove for {}: {}", name, e);
    }

    if cluster.spec.deletion_policy == DeletionPolicy::Orphan {
        info!(
            "Orphaning database cluster {} ({})",
            name,
            cluster.external_name()
        );
        return Ok(Action::await_change());
    }

    info!("Deleting database cluster for {}", name);

    let mut cr = cluster.clone();
    let external = ctx.connector.connect(&cr).await?;
    external.delete(&mut cr).await?;

    if let Err(e) = patch_status(&cr, ctx).await {
        warn!("Cannot record Deleting condition on {}: {}", name, e);
    }

    Ok(Action::await_change())
}

/// Run `op` up to `attempts` times, sleeping `backoff` between failures
async fn retry<F, Fut, T>(attempts: u32, backoff: Duration, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, "Retrying after error: {}", e);
                attempt += 1;
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Store the remote identifier as the external-name annotation
async fn persist_external_name(cr: &DODatabaseCluster, ctx: &Context) -> Result<(), Error> {
    let clusters: Api<DODatabaseCluster> = Api::all(ctx.client.clone());
    let patch = serde_json::json!({
        "metadata": {
            "annotations": {
                EXTERNAL_NAME_ANNOTATION: cr.external_name()
            }
        }
    });

    clusters
        .patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(|e| Error::KubeError(format!("Failed to set external name: {}", e)))?;

    info!("Bound {} to external name {}", cr.name_any(), cr.external_name());
    Ok(())
}

/// Write the observation and conditions to the status subresource
async fn patch_status(cr: &DODatabaseCluster, ctx: &Context) -> Result<(), Error> {
    let Some(status) = &cr.status else {
        return Ok(());
    };

    let clusters: Api<DODatabaseCluster> = Api::all(ctx.client.clone());
    let patch = serde_json::json!({
        "status": status
    });

    clusters
        .patch_status(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(|e| Error::KubeError(format!("Failed to update status: {}", e)))?;

    Ok(())
}

async fn publish_connection_details(
    cr: &DODatabaseCluster,
    details: &ConnectionDetails,
    ctx: &Context,
) -> Result<(), Error> {
    if details.is_empty() {
        return Ok(());
    }

    match &cr.spec.write_connection_secret_to_reference {
        Some(reference) => {
            secrets::apply_connection_secret(&ctx.client, cr, reference, details).await
        }
        None => Ok(()),
    }
}

/// Error policy for the controller
fn error_policy(cluster: Arc<DODatabaseCluster>, err: &Error, _ctx: Arc<Context>) -> Action {
    error!("Reconciliation error for {}: {:?}", cluster.name_any(), err);
    Action::requeue(requeue_after(err))
}

/// Requeue delay for a failed reconcile
pub fn requeue_after(err: &Error) -> Duration {
    match err {
        Error::Remote { .. } | Error::EmptyResponse(_) | Error::KubeError(_) => {
            Duration::from_secs(30)
        }
        Error::NameRequired
        | Error::WrongResourceKind
        | Error::AuthError(_)
        | Error::ConfigError(_)
        | Error::SecretError(_) => Duration::from_secs(300),
        Error::FinalizerError(_) => Duration::from_secs(60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::digitalocean::ClientError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_transient_errors_retry_quickly() {
        let remote = Error::remote(
            "cannot get a Database Cluster",
            ClientError::Api {
                status: 503,
                message: "unavailable".to_string(),
            },
        );
        assert_eq!(requeue_after(&remote), Duration::from_secs(30));
        assert_eq!(
            requeue_after(&Error::KubeError("conflict".to_string())),
            Duration::from_secs(30)
        );
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = retry(3, Duration::ZERO, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::KubeError("conflict".to_string()))
            } else {
                Ok("db-1")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "db-1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error_after_all_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), Error> = retry(3, Duration::ZERO, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::KubeError(format!("attempt {}", n + 1)))
        })
        .await;

        assert!(matches!(result, Err(Error::KubeError(ref m)) if m == "attempt 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_removing_unknown_gauge_label_is_harmless() {
        assert!(CLUSTER_AVAILABLE
            .remove_label_values(&["never-reconciled"])
            .is_err());
    }

    #[test]
    fn test_user_errors_back_off() {
        assert_eq!(requeue_after(&Error::NameRequired), Duration::from_secs(300));
        assert_eq!(
            requeue_after(&Error::AuthError("no token".to_string())),
            Duration::from_secs(300)
        );
    }
}
