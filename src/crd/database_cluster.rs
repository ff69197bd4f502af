//! DODatabaseCluster Custom Resource Definition

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::any::Any;

use super::{Condition, ConditionReason};
use crate::managed::Managed;

/// Annotation holding the identifier assigned by DigitalOcean
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Remote lifecycle status reported while a cluster is provisioning
pub const STATUS_CREATING: &str = "creating";
/// Remote lifecycle status reported once a cluster serves traffic
pub const STATUS_ONLINE: &str = "online";
/// Remote lifecycle status reported during a region migration
pub const STATUS_MIGRATING: &str = "migrating";
/// Remote lifecycle status reported during a size change
pub const STATUS_RESIZING: &str = "resizing";
/// Remote lifecycle status reported while a fork is being taken
pub const STATUS_FORKING: &str = "forking";

/// DODatabaseCluster resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "database.do.crossplane.io",
    version = "v1alpha1",
    kind = "DODatabaseCluster",
    plural = "dodatabaseclusters",
    singular = "dodatabasecluster",
    shortname = "dodb",
    status = "DODatabaseClusterStatus",
    printcolumn = r#"{"name": "Ready", "type": "string", "jsonPath": ".status.conditions[?(@.type=='Ready')].reason"}"#,
    printcolumn = r#"{"name": "Engine", "type": "string", "jsonPath": ".spec.forProvider.engine"}"#,
    printcolumn = r#"{"name": "Region", "type": "string", "jsonPath": ".spec.forProvider.region"}"#,
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.atProvider.status"}"#,
    printcolumn = r#"{"name": "External-Name", "type": "string", "jsonPath": ".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DODatabaseClusterSpec {
    /// Desired state of the remote database cluster
    pub for_provider: DODatabaseClusterParameters,

    /// ProviderConfig holding the DigitalOcean credentials
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,

    /// Secret to publish connection details to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_reference: Option<SecretReference>,

    /// What happens to the remote cluster when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// Parameters of a DigitalOcean managed database cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DODatabaseClusterParameters {
    /// Database engine slug (pg, mysql, redis, mongodb, kafka)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Engine version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of nodes in the cluster
    pub num_nodes: i32,

    /// Node size slug, e.g. db-s-1vcpu-1gb
    pub size: String,

    /// Region slug, e.g. nyc1
    pub region: String,

    /// VPC the cluster is placed in
    #[serde(rename = "privateNetworkUUID", skip_serializing_if = "Option::is_none")]
    pub private_network_uuid: Option<String>,

    /// Tags applied to the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Reference to a cluster-scoped ProviderConfig
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ProviderConfigReference {
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

/// Namespaced Secret reference
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SecretReference {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
}

/// Deletion policy for the remote resource
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the remote cluster with the resource
    #[default]
    Delete,
    /// Leave the remote cluster running
    Orphan,
}

/// Observed state of the remote database cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DODatabaseClusterObservation {
    /// Identifier assigned by DigitalOcean
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_nodes: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Remote lifecycle status (creating, online, resizing, migrating, forking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "privateNetworkUUID", skip_serializing_if = "Option::is_none")]
    pub private_network_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// DODatabaseCluster status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DODatabaseClusterStatus {
    /// Mirror of the remote cluster
    #[serde(default)]
    pub at_provider: DODatabaseClusterObservation,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl DODatabaseClusterStatus {
    /// Set a condition, replacing any existing condition of the same type.
    ///
    /// The transition time is only bumped when the status or reason changes.
    pub fn set_condition(&mut self, condition: Condition) {
        let existing = self
            .conditions
            .iter()
            .position(|c| c.type_ == condition.type_);

        match existing {
            Some(idx) => {
                let current = &self.conditions[idx];
                if current.status != condition.status || current.reason != condition.reason {
                    self.conditions[idx] = condition;
                }
            }
            None => self.conditions.push(condition),
        }
    }

    /// Reason of the current Ready condition, if any
    pub fn ready_reason(&self) -> Option<ConditionReason> {
        self.conditions
            .iter()
            .find(|c| c.type_ == super::READY_CONDITION)
            .and_then(|c| c.reason.as_deref())
            .and_then(ConditionReason::parse)
    }
}

impl DODatabaseCluster {
    /// External name annotation, empty when unset
    pub fn external_name(&self) -> &str {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Bind the remote identifier to this resource
    pub fn set_external_name(&mut self, name: impl Into<String>) {
        self.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.into());
    }

    /// Set a condition on the status, creating the status if needed
    pub fn set_condition(&mut self, condition: Condition) {
        self.status
            .get_or_insert_with(Default::default)
            .set_condition(condition);
    }
}

impl Managed for DODatabaseCluster {
    fn provider_config_name(&self) -> &str {
        &self.spec.provider_config_ref.name
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
