//! Minimal DigitalOcean Managed Databases API client
//!
//! Only the calls the database cluster controller needs are implemented:
//! fetch by id, create and delete. The [`DatabasesApi`] trait is the seam
//! the adapter depends on so that it can be exercised without a network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Default DigitalOcean API endpoint
pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

/// Errors returned by the DigitalOcean client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// API answered successfully but without the expected resource
    #[error("Empty response body: {0}")]
    EmptyBody(String),

    /// Invalid URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether the API reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status == StatusCode::NOT_FOUND.as_u16(),
            ClientError::Http(e) => e.status() == Some(StatusCode::NOT_FOUND),
            ClientError::EmptyBody(_) | ClientError::InvalidUrl(_) => false,
        }
    }
}

/// Connection endpoint of a database cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DatabaseConnection {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssl: bool,
}

/// A managed database cluster as returned by the API
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "engine", default)]
    pub engine_slug: String,
    #[serde(rename = "version", default)]
    pub version_slug: String,
    #[serde(default)]
    pub connection: Option<DatabaseConnection>,
    #[serde(default)]
    pub private_connection: Option<DatabaseConnection>,
    #[serde(default)]
    pub num_nodes: i32,
    #[serde(rename = "size", default)]
    pub size_slug: String,
    #[serde(rename = "region", default)]
    pub region_slug: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub private_network_uuid: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of a create call
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DatabaseCreateRequest {
    pub name: String,
    #[serde(rename = "engine")]
    pub engine_slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "size")]
    pub size_slug: String,
    pub region: String,
    pub num_nodes: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_network_uuid: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
struct DatabaseRoot {
    #[serde(default)]
    database: Option<Database>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// Database cluster calls used by the controller
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabasesApi: Send + Sync {
    /// Fetch a cluster by identifier
    async fn get(&self, id: &str) -> Result<Database, ClientError>;

    /// Create a cluster; `None` when the API answered without a body
    async fn create(&self, request: &DatabaseCreateRequest) -> Result<Option<Database>, ClientError>;

    /// Delete a cluster by identifier
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// Token-authenticated DigitalOcean API client
#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    base_url: String,
    http: HttpClient,
    token: String,
}

impl DigitalOceanClient {
    /// Create a client for `base_url` authenticating with `token`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("digitalocean-database-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            http,
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/v2/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    /// Turn non-2xx responses into [`ClientError::Api`]
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DatabasesApi for DigitalOceanClient {
    async fn get(&self, id: &str) -> Result<Database, ClientError> {
        let request = self.with_auth(self.http.get(self.url(&format!("databases/{}", id))));
        let response = Self::check(request.send().await?).await?;
        let root: DatabaseRoot = response.json().await?;

        root.database
            .ok_or_else(|| ClientError::EmptyBody(format!("database {} missing from response", id)))
    }

    async fn create(&self, request: &DatabaseCreateRequest) -> Result<Option<Database>, ClientError> {
        let builder = self.with_auth(self.http.post(self.url("databases"))).json(request);
        let response = Self::check(builder.send().await?).await?;
        let root: DatabaseRoot = response.json().await?;
        Ok(root.database)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let request = self.with_auth(self.http.delete(self.url(&format!("databases/{}", id))));
        Self::check(request.send().await?).await?;
        Ok(())
    }
}
