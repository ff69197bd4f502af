//! Kubernetes Secret reading and connection secret publishing

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::info;

use crate::crd::{DODatabaseCluster, SecretReference};
use crate::managed::ConnectionDetails;
use crate::{Error, Result};

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "digitalocean-database-operator";

/// Fetch a secret by name from the given namespace
pub async fn get_secret(client: &Client, namespace: &str, name: &str) -> Result<Secret> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secrets
        .get(name)
        .await
        .map_err(|e| Error::KubeError(format!("Failed to get secret {}/{}: {}", namespace, name, e)))
}

/// Get a specific key from a secret
pub fn get_secret_key(secret: &Secret, key: &str) -> Result<String> {
    let data = secret
        .data
        .as_ref()
        .ok_or_else(|| Error::SecretError("Secret has no data".to_string()))?;

    let value = data
        .get(key)
        .ok_or_else(|| Error::SecretError(format!("Key '{}' not found in secret", key)))?;

    String::from_utf8(value.0.clone())
        .map_err(|e| Error::SecretError(format!("Invalid UTF-8 in secret key '{}': {}", key, e)))
}

/// Build the connection Secret for a database cluster
pub fn build_connection_secret(
    cluster: &DODatabaseCluster,
    reference: &SecretReference,
    details: &ConnectionDetails,
) -> Secret {
    let data: BTreeMap<String, ByteString> = details
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(reference.name.clone()),
            namespace: Some(reference.namespace.clone()),
            owner_references: Some(vec![build_owner_reference(cluster)]),
            ..Default::default()
        },
        type_: Some("connection.crossplane.io/v1alpha1".to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// Create or update the connection Secret
pub async fn apply_connection_secret(
    client: &Client,
    cluster: &DODatabaseCluster,
    reference: &SecretReference,
    details: &ConnectionDetails,
) -> Result<()> {
    let secret = build_connection_secret(cluster, reference, details);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &reference.namespace);
    let patch_params = PatchParams::apply(FIELD_MANAGER).force();

    secrets
        .patch(&reference.name, &patch_params, &Patch::Apply(&secret))
        .await
        .map_err(|e| Error::KubeError(format!("Failed to apply connection secret: {}", e)))?;

    info!(
        "Published connection secret {}/{} for {}",
        reference.namespace,
        reference.name,
        cluster.name_any()
    );

    Ok(())
}

fn build_owner_reference(cluster: &DODatabaseCluster) -> OwnerReference {
    OwnerReference {
        api_version: "database.do.crossplane.io/v1alpha1".to_string(),
        kind: "DODatabaseCluster".to_string(),
        name: cluster.name_any(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DODatabaseClusterParameters, DODatabaseClusterSpec};

    fn cluster() -> DODatabaseCluster {
        let mut cluster = DODatabaseCluster::new(
            "backend",
            DODatabaseClusterSpec {
                for_provider: DODatabaseClusterParameters::default(),
                provider_config_ref: Default::default(),
                write_connection_secret_to_reference: None,
                deletion_policy: Default::default(),
            },
        );
        cluster.metadata.uid = Some("uid-1".to_string());
        cluster
    }

    #[test]
    fn test_get_secret_key_decodes_value() {
        let mut data = BTreeMap::new();
        data.insert("token".to_string(), ByteString(b"dop_v1_abc".to_vec()));
        let secret = Secret {
            data: Some(data),
            ..Default::default()
        };

        assert_eq!(get_secret_key(&secret, "token").unwrap(), "dop_v1_abc");
        assert!(matches!(
            get_secret_key(&secret, "missing"),
            Err(Error::SecretError(_))
        ));
    }

    #[test]
    fn test_get_secret_key_without_data() {
        let secret = Secret::default();
        assert!(matches!(
            get_secret_key(&secret, "token"),
            Err(Error::SecretError(_))
        ));
    }

    #[test]
    fn test_connection_secret_is_owned_by_cluster() {
        let reference = SecretReference {
            name: "backend-conn".to_string(),
            namespace: "apps".to_string(),
        };
        let mut details = ConnectionDetails::new();
        details.insert("password".to_string(), b"secret".to_vec());

        let secret = build_connection_secret(&cluster(), &reference, &details);

        assert_eq!(secret.metadata.namespace.as_deref(), Some("apps"));
        let owner = &secret.metadata.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "DODatabaseCluster");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(
            secret.data.unwrap().get("password"),
            Some(&ByteString(b"secret".to_vec()))
        );
    }
}
