//! Custom Resource Definitions for the DigitalOcean Database Operator

mod database_cluster;
mod provider_config;

pub use database_cluster::*;
pub use provider_config::*;

use chrono::{DateTime, Utc};
use kube::CustomResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type carrying the lifecycle reason
pub const READY_CONDITION: &str = "Ready";

/// Generate CRD YAML manifests for all custom resources
pub fn generate_crds() -> Vec<String> {
    vec![
        serde_yaml::to_string(&DODatabaseCluster::crd()).unwrap(),
        serde_yaml::to_string(&ProviderConfig::crd()).unwrap(),
    ]
}

/// Status condition
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status (True, False, Unknown)
    pub status: String,

    /// Last transition time
    pub last_transition_time: DateTime<Utc>,

    /// Reason for the condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Coarse lifecycle state surfaced through the Ready condition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionReason {
    Creating,
    Available,
    Unavailable,
    Deleting,
}

impl ConditionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionReason::Creating => "Creating",
            ConditionReason::Available => "Available",
            ConditionReason::Unavailable => "Unavailable",
            ConditionReason::Deleting => "Deleting",
        }
    }

    pub fn parse(reason: &str) -> Option<Self> {
        match reason {
            "Creating" => Some(ConditionReason::Creating),
            "Available" => Some(ConditionReason::Available),
            "Unavailable" => Some(ConditionReason::Unavailable),
            "Deleting" => Some(ConditionReason::Deleting),
            _ => None,
        }
    }

    /// Build the Ready condition for this reason
    pub fn condition(self) -> Condition {
        let status = if self == ConditionReason::Available {
            "True"
        } else {
            "False"
        };

        Condition {
            type_: READY_CONDITION.to_string(),
            status: status.to_string(),
            last_transition_time: Utc::now(),
            reason: Some(self.as_str().to_string()),
            message: None,
        }
    }
}
