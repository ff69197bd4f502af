//! DigitalOcean credential resolution from ProviderConfig objects

use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crate::clients::secrets;
use crate::crd::{ProviderConfig, SecretKeySelector};
use crate::{Error, Result};

/// Credential source supported by ProviderConfig
pub const CREDENTIALS_SOURCE_SECRET: &str = "Secret";

/// Resolve the API token referenced by the named ProviderConfig
pub async fn get_auth_info(client: &Client, provider_config: &str) -> Result<String> {
    let configs: Api<ProviderConfig> = Api::all(client.clone());
    let pc = configs.get(provider_config).await.map_err(|e| {
        Error::AuthError(format!(
            "cannot get ProviderConfig {}: {}",
            provider_config, e
        ))
    })?;

    let selector = secret_selector(&pc)?;

    debug!(
        "Reading DigitalOcean token from secret {}/{}",
        selector.namespace, selector.name
    );

    let secret = secrets::get_secret(client, &selector.namespace, &selector.name)
        .await
        .map_err(|e| Error::AuthError(e.to_string()))?;

    token_from_secret(&pc, &secret)
}

/// Secret reference of a ProviderConfig using the Secret credentials source
pub fn secret_selector(pc: &ProviderConfig) -> Result<&SecretKeySelector> {
    let credentials = &pc.spec.credentials;
    if credentials.source != CREDENTIALS_SOURCE_SECRET {
        return Err(Error::AuthError(format!(
            "unsupported credentials source {:?} in ProviderConfig {}",
            credentials.source,
            pc.name_any()
        )));
    }

    credentials.secret_ref.as_ref().ok_or_else(|| {
        Error::AuthError(format!(
            "ProviderConfig {} has no credentials secretRef",
            pc.name_any()
        ))
    })
}

/// Extract the trimmed API token that `pc` points at from `secret`
pub fn token_from_secret(pc: &ProviderConfig, secret: &Secret) -> Result<String> {
    let selector = secret_selector(pc)?;

    let token = secrets::get_secret_key(secret, &selector.key)
        .map_err(|e| Error::AuthError(e.to_string()))?;

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::AuthError(format!(
            "empty DigitalOcean token in secret {}/{}",
            selector.namespace, selector.name
        )));
    }

    Ok(token.to_string())
}
