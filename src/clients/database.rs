//! Translation between DODatabaseCluster parameters and the DigitalOcean API

use crate::clients::digitalocean::{Database, DatabaseCreateRequest};
use crate::crd::{DODatabaseClusterObservation, DODatabaseClusterParameters};
use crate::managed::ConnectionDetails;

/// Connection secret key for the full connection URI
pub const CONNECTION_URI_KEY: &str = "uri";
/// Connection secret key for the host
pub const CONNECTION_ENDPOINT_KEY: &str = "endpoint";
/// Connection secret key for the port
pub const CONNECTION_PORT_KEY: &str = "port";
/// Connection secret key for the admin user
pub const CONNECTION_USERNAME_KEY: &str = "username";
/// Connection secret key for the admin password
pub const CONNECTION_PASSWORD_KEY: &str = "password";
/// Connection secret key for the default database
pub const CONNECTION_DATABASE_KEY: &str = "database";
/// Connection secret key for the private network URI
pub const CONNECTION_PRIVATE_URI_KEY: &str = "privateUri";
/// Connection secret key for the private network host
pub const CONNECTION_PRIVATE_ENDPOINT_KEY: &str = "privateEndpoint";

/// Build a create request for a cluster named `name`
pub fn generate_database(name: &str, params: &DODatabaseClusterParameters) -> DatabaseCreateRequest {
    DatabaseCreateRequest {
        name: name.to_string(),
        engine_slug: params.engine.clone().unwrap_or_default(),
        version: params.version.clone().unwrap_or_default(),
        num_nodes: params.num_nodes,
        size_slug: params.size.clone(),
        region: params.region.clone(),
        private_network_uuid: params.private_network_uuid.clone().unwrap_or_default(),
        tags: params.tags.clone(),
    }
}

/// Fill unset optional parameters from the observed cluster.
///
/// Fields the user already set are left untouched. `version` is seeded from
/// the observed engine slug.
pub fn late_initialize_spec(params: &mut DODatabaseClusterParameters, observed: &Database) {
    params.version = late_initialize_string(params.version.take(), &observed.engine_slug);
    params.private_network_uuid =
        late_initialize_string(params.private_network_uuid.take(), &observed.private_network_uuid);

    if params.tags.is_empty() && !observed.tags.is_empty() {
        params.tags = observed.tags.to_vec();
    }
}

fn late_initialize_string(current: Option<String>, observed: &str) -> Option<String> {
    match current {
        Some(value) => Some(value),
        None if observed.is_empty() => None,
        None => Some(observed.to_string()),
    }
}

/// Mirror the remote cluster into the resource status
pub fn generate_observation(db: &Database) -> DODatabaseClusterObservation {
    DODatabaseClusterObservation {
        id: non_empty(&db.id),
        name: non_empty(&db.name),
        engine: non_empty(&db.engine_slug),
        version: non_empty(&db.version_slug),
        num_nodes: Some(db.num_nodes),
        size: non_empty(&db.size_slug),
        region: non_empty(&db.region_slug),
        status: non_empty(&db.status),
        created_at: db.created_at,
        private_network_uuid: non_empty(&db.private_network_uuid),
        tags: db.tags.clone(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Extract connection secret entries from a cluster
pub fn generate_connection_details(db: &Database) -> ConnectionDetails {
    let mut details = ConnectionDetails::new();

    if let Some(conn) = &db.connection {
        insert_non_empty(&mut details, CONNECTION_URI_KEY, &conn.uri);
        insert_non_empty(&mut details, CONNECTION_ENDPOINT_KEY, &conn.host);
        insert_non_empty(&mut details, CONNECTION_USERNAME_KEY, &conn.user);
        insert_non_empty(&mut details, CONNECTION_PASSWORD_KEY, &conn.password);
        insert_non_empty(&mut details, CONNECTION_DATABASE_KEY, &conn.database);
        if conn.port != 0 {
            details.insert(CONNECTION_PORT_KEY.to_string(), conn.port.to_string().into_bytes());
        }
    }

    if let Some(private) = &db.private_connection {
        insert_non_empty(&mut details, CONNECTION_PRIVATE_URI_KEY, &private.uri);
        insert_non_empty(&mut details, CONNECTION_PRIVATE_ENDPOINT_KEY, &private.host);
    }

    details
}

fn insert_non_empty(details: &mut ConnectionDetails, key: &str, value: &str) {
    if !value.is_empty() {
        details.insert(key.to_string(), value.as_bytes().to_vec());
    }
}
