//! Integration tests for DODatabaseCluster translation helpers
//!
//! These tests cover request building, late initialization, observation
//! generation and the CRD wire format.

use digitalocean_database_operator::clients::database::{
    generate_connection_details, generate_database, generate_observation, late_initialize_spec,
};
use digitalocean_database_operator::clients::digitalocean::{Database, DatabaseConnection};
use digitalocean_database_operator::crd::{
    ConditionReason, DODatabaseCluster, DODatabaseClusterParameters, DODatabaseClusterSpec,
    DeletionPolicy, EXTERNAL_NAME_ANNOTATION, READY_CONDITION,
};
use digitalocean_database_operator::reconcilers::database::{
    condition_for_status, set_provider_status,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn full_params() -> DODatabaseClusterParameters {
    DODatabaseClusterParameters {
        engine: Some("mysql".to_string()),
        version: Some("8".to_string()),
        num_nodes: 3,
        size: "db-s-2vcpu-4gb".to_string(),
        region: "ams3".to_string(),
        private_network_uuid: Some("vpc-123".to_string()),
        tags: vec!["env:prod".to_string()],
    }
}

fn minimal_params() -> DODatabaseClusterParameters {
    DODatabaseClusterParameters {
        engine: Some("pg".to_string()),
        num_nodes: 1,
        size: "db-s-1vcpu-1gb".to_string(),
        region: "nyc1".to_string(),
        ..Default::default()
    }
}

fn observed() -> Database {
    Database {
        id: "db-1".to_string(),
        name: "orders".to_string(),
        engine_slug: "v2".to_string(),
        version_slug: "16".to_string(),
        num_nodes: 1,
        size_slug: "db-s-1vcpu-1gb".to_string(),
        region_slug: "nyc1".to_string(),
        status: "online".to_string(),
        private_network_uuid: "vpc-observed".to_string(),
        tags: vec!["a".to_string(), "b".to_string()],
        ..Default::default()
    }
}

fn cluster_with_status(status: &str) -> DODatabaseCluster {
    let mut cr = DODatabaseCluster::new(
        "orders",
        DODatabaseClusterSpec {
            for_provider: minimal_params(),
            provider_config_ref: Default::default(),
            write_connection_secret_to_reference: None,
            deletion_policy: Default::default(),
        },
    );
    cr.status.get_or_insert_with(Default::default).at_provider.status = Some(status.to_string());
    cr
}

// ============================================================================
// Request Builder Tests
// ============================================================================

#[test]
fn request_copies_desired_fields() {
    let params = full_params();
    let request = generate_database("orders", &params);

    assert_eq!(request.name, "orders");
    assert_eq!(request.engine_slug, "mysql");
    assert_eq!(request.version, "8");
    assert_eq!(request.num_nodes, 3);
    assert_eq!(request.size_slug, "db-s-2vcpu-4gb");
    assert_eq!(request.region, "ams3");
    assert_eq!(request.private_network_uuid, "vpc-123");
    assert_eq!(request.tags, vec!["env:prod".to_string()]);
}

#[test]
fn request_defaults_unset_optionals_to_empty() {
    let request = generate_database("orders", &minimal_params());

    assert_eq!(request.version, "");
    assert_eq!(request.private_network_uuid, "");
    assert!(request.tags.is_empty());
}

// ============================================================================
// Late Initialization Tests
// ============================================================================

#[test]
fn late_init_never_overwrites_version() {
    let mut params = minimal_params();
    params.version = Some("v1".to_string());

    late_initialize_spec(&mut params, &observed());

    assert_eq!(params.version.as_deref(), Some("v1"));
}

#[test]
fn late_init_seeds_version_from_engine_slug() {
    let mut params = minimal_params();

    late_initialize_spec(&mut params, &observed());

    assert_eq!(params.version.as_deref(), Some("v2"));
}

#[test]
fn late_init_fills_private_network_only_when_unset() {
    let mut unset = minimal_params();
    late_initialize_spec(&mut unset, &observed());
    assert_eq!(unset.private_network_uuid.as_deref(), Some("vpc-observed"));

    let mut set = full_params();
    late_initialize_spec(&mut set, &observed());
    assert_eq!(set.private_network_uuid.as_deref(), Some("vpc-123"));
}

#[test]
fn late_init_copies_tags_into_empty_set() {
    let mut params = minimal_params();

    late_initialize_spec(&mut params, &observed());

    assert_eq!(params.tags, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn late_init_keeps_user_tags() {
    let mut params = minimal_params();
    params.tags = vec!["x".to_string()];

    late_initialize_spec(&mut params, &observed());

    assert_eq!(params.tags, vec!["x".to_string()]);
}

#[test]
fn late_init_ignores_empty_observed_values() {
    let mut params = minimal_params();
    let mut db = observed();
    db.engine_slug.clear();
    db.private_network_uuid.clear();
    db.tags.clear();

    late_initialize_spec(&mut params, &db);

    assert_eq!(params, minimal_params());
}

#[test]
fn late_init_is_idempotent() {
    let mut params = minimal_params();
    late_initialize_spec(&mut params, &observed());
    let first = params.clone();

    late_initialize_spec(&mut params, &observed());

    assert_eq!(params, first);
}

// ============================================================================
// Observation & Connection Details Tests
// ============================================================================

#[test]
fn observation_mirrors_remote_cluster() {
    let observation = generate_observation(&observed());

    assert_eq!(observation.id.as_deref(), Some("db-1"));
    assert_eq!(observation.engine.as_deref(), Some("v2"));
    assert_eq!(observation.version.as_deref(), Some("16"));
    assert_eq!(observation.status.as_deref(), Some("online"));
    assert_eq!(observation.private_network_uuid.as_deref(), Some("vpc-observed"));
    assert_eq!(observation.tags.len(), 2);
}

#[test]
fn connection_details_skip_missing_values() {
    let mut db = observed();
    db.connection = Some(DatabaseConnection {
        uri: "mysql://doadmin:pw@host:25060/defaultdb".to_string(),
        host: "host".to_string(),
        port: 25060,
        user: "doadmin".to_string(),
        ..Default::default()
    });

    let details = generate_connection_details(&db);

    assert_eq!(details.get("endpoint"), Some(&b"host".to_vec()));
    assert_eq!(details.get("port"), Some(&b"25060".to_vec()));
    assert!(!details.contains_key("password"));
    assert!(!details.contains_key("privateUri"));
}

#[test]
fn connection_details_empty_without_connection() {
    assert!(generate_connection_details(&observed()).is_empty());
}

// ============================================================================
// Status Mapping Tests
// ============================================================================

#[test]
fn status_maps_to_ready_reason() {
    let cases = [
        ("creating", Some(ConditionReason::Creating)),
        ("online", Some(ConditionReason::Available)),
        ("forking", Some(ConditionReason::Unavailable)),
        ("migrating", None),
        ("resizing", None),
        ("decommissioned", None),
    ];

    for (status, expected) in cases {
        assert_eq!(condition_for_status(status), expected, "status {}", status);
    }
}

#[test]
fn status_online_marks_ready_true() {
    let mut cr = cluster_with_status("online");

    set_provider_status(&mut cr);

    let status = cr.status.unwrap();
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].type_, READY_CONDITION);
    assert_eq!(status.conditions[0].status, "True");
    assert_eq!(status.conditions[0].reason.as_deref(), Some("Available"));
}

#[test]
fn status_migrating_leaves_condition_alone() {
    let mut cr = cluster_with_status("migrating");
    cr.set_condition(ConditionReason::Available.condition());
    let before = cr.status.clone();

    set_provider_status(&mut cr);
    set_provider_status(&mut cr);

    assert_eq!(cr.status, before);
}

#[test]
fn status_forking_is_unavailable() {
    let mut cr = cluster_with_status("forking");

    set_provider_status(&mut cr);

    let status = cr.status.unwrap();
    assert_eq!(status.ready_reason(), Some(ConditionReason::Unavailable));
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].status, "False");
}

#[test]
fn repeated_condition_keeps_transition_time() {
    let mut cr = cluster_with_status("online");
    set_provider_status(&mut cr);
    let first = cr.status.as_ref().unwrap().conditions[0].last_transition_time;

    set_provider_status(&mut cr);

    let status = cr.status.unwrap();
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].last_transition_time, first);
    assert_eq!(status.conditions[0].status, "True");
}

// ============================================================================
// CRD Wire Format Tests
// ============================================================================

#[test]
fn crd_deserializes_manifest() {
    let manifest = serde_json::json!({
        "apiVersion": "database.do.crossplane.io/v1alpha1",
        "kind": "DODatabaseCluster",
        "metadata": {
            "name": "orders",
            "annotations": { EXTERNAL_NAME_ANNOTATION: "db-1" }
        },
        "spec": {
            "forProvider": {
                "engine": "pg",
                "numNodes": 2,
                "size": "db-s-1vcpu-2gb",
                "region": "fra1",
                "privateNetworkUUID": "vpc-9"
            },
            "writeConnectionSecretToReference": {
                "name": "orders-conn",
                "namespace": "shop"
            },
            "deletionPolicy": "Orphan"
        }
    });

    let cr: DODatabaseCluster = serde_json::from_value(manifest).unwrap();

    assert_eq!(cr.external_name(), "db-1");
    assert_eq!(cr.spec.for_provider.num_nodes, 2);
    assert_eq!(cr.spec.for_provider.private_network_uuid.as_deref(), Some("vpc-9"));
    assert_eq!(cr.spec.provider_config_ref.name, "default");
    assert_eq!(cr.spec.deletion_policy, DeletionPolicy::Orphan);
    assert!(cr.spec.for_provider.tags.is_empty());
}

#[test]
fn crds_generate_for_all_kinds() {
    let crds = digitalocean_database_operator::crd::generate_crds();

    assert_eq!(crds.len(), 2);
    assert!(crds[0].contains("dodatabaseclusters.database.do.crossplane.io"));
    assert!(crds[1].contains("providerconfigs.do.crossplane.io"));
}
