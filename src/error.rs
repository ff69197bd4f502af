//! Error types for the DigitalOcean Database Operator

use thiserror::Error;

use crate::clients::digitalocean::ClientError;

/// Result type for the operator
pub type Result<T> = std::result::Result<T, Error>;

/// Managed resource handed to an adapter of a different kind
pub const ERR_NOT_DB: &str = "managed resource is not a Database Cluster resource";
/// Fetching the remote cluster failed
pub const ERR_GET_DB: &str = "cannot get a Database Cluster";
/// Neither external name nor object name is set
pub const ERR_DB_NAME_REQUIRED: &str = "name of Database Cluster is required";
/// Creating the remote cluster failed
pub const ERR_DB_CREATE_FAILED: &str = "creation of Database Cluster resource has failed";
/// Deleting the remote cluster failed
pub const ERR_DB_DELETE_FAILED: &str = "deletion of Database Cluster resource has failed";
/// Persisting late-initialized fields failed
pub const ERR_DB_UPDATE: &str = "cannot update managed Database Cluster resource";

/// Error type for the operator
#[derive(Debug, Error)]
pub enum Error {
    /// The adapter was invoked with a resource it does not manage
    #[error("{}", ERR_NOT_DB)]
    WrongResourceKind,

    /// No name could be resolved for a new cluster
    #[error("{}", ERR_DB_NAME_REQUIRED)]
    NameRequired,

    /// DigitalOcean API call failed
    #[error("{context}: {source}")]
    Remote {
        context: &'static str,
        #[source]
        source: ClientError,
    },

    /// The DigitalOcean API accepted a request but returned no resource
    #[error("{0}: empty response from DigitalOcean API")]
    EmptyResponse(&'static str),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    /// Credential resolution error
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Secret error
    #[error("Secret error: {0}")]
    SecretError(String),

    /// Finalizer error
    #[error("Finalizer error: {0}")]
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),
}

impl Error {
    /// Wrap a DigitalOcean client error with a call-site tag
    pub fn remote(context: &'static str, source: ClientError) -> Self {
        Error::Remote { context, source }
    }
}

impl From<kube::runtime::finalizer::Error<Error>> for Error {
    fn from(err: kube::runtime::finalizer::Error<Error>) -> Self {
        Error::FinalizerError(Box::new(err))
    }
}
