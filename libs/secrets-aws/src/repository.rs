//! The secret repository capability and its AWS adapter

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::remote::SecretsManagerApi;
use crate::{ProviderError, RepositoryError, Secret, SecretRepositoryError};

const ORIGINATOR: &str = "AwsSecretRepository";
const GET_FAILED: &str = "failed to query the value of a secret, by name";
const SET_FAILED: &str = "failed to set the value for a secret, by name";

/// Get/set-by-name access to secrets, independent of the provider
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Fetch the current value of the secret called `name`
    async fn get_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Secret, SecretRepositoryError>;

    /// Write `value` as the current value of the secret called `name`.
    ///
    /// The returned [`Secret`] carries `value` as given, it is not read back
    /// from the provider.
    async fn set_by_name(
        &self,
        name: &str,
        value: SecretString,
        cancel: &CancellationToken,
    ) -> Result<Secret, SecretRepositoryError>;
}

/// [`SecretRepository`] backed by AWS Secrets Manager.
///
/// Every call is exactly one remote request. No retries, no caching.
#[derive(Clone)]
pub struct AwsSecretRepository {
    client: Arc<dyn SecretsManagerApi>,
}

impl AwsSecretRepository {
    pub fn new(client: Arc<dyn SecretsManagerApi>) -> Self {
        Self { client }
    }

    async fn fetch(&self, name: &str, cancel: &CancellationToken) -> Result<Secret, ProviderError> {
        let response = self.client.get_secret_value(name, cancel).await?;
        ensure_ok(response.status)?;

        let key = response.arn.ok_or(ProviderError::MissingField("ARN"))?;
        let value = response
            .secret_string
            .ok_or(ProviderError::MissingField("SecretString"))?;

        Ok(Secret::new(key, name, value))
    }

    async fn store(
        &self,
        name: &str,
        value: SecretString,
        cancel: &CancellationToken,
    ) -> Result<Secret, ProviderError> {
        let response = self.client.put_secret_value(name, &value, cancel).await?;
        ensure_ok(response.status)?;

        let key = response.arn.ok_or(ProviderError::MissingField("ARN"))?;
        debug!(secret = %name, version = ?response.version_id, "Secret value stored");

        Ok(Secret::new(key, name, value))
    }
}

#[async_trait]
impl SecretRepository for AwsSecretRepository {
    async fn get_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Secret, SecretRepositoryError> {
        if name.is_empty() {
            return Err(SecretRepositoryError::empty_argument("name"));
        }

        match self.fetch(name, cancel).await {
            Ok(secret) => {
                debug!(secret = %name, "Secret retrieved");
                Ok(secret)
            }
            Err(e) => {
                warn!(secret = %name, error = %e, "Failed to get secret from AWS");
                Err(RepositoryError::new(GET_FAILED, ORIGINATOR)
                    .with_source(e)
                    .into())
            }
        }
    }

    async fn set_by_name(
        &self,
        name: &str,
        value: SecretString,
        cancel: &CancellationToken,
    ) -> Result<Secret, SecretRepositoryError> {
        if name.is_empty() {
            return Err(SecretRepositoryError::empty_argument("name"));
        }

        match self.store(name, value, cancel).await {
            Ok(secret) => Ok(secret),
            Err(e) => {
                warn!(secret = %name, error = %e, "Failed to set secret in AWS");
                Err(RepositoryError::new(SET_FAILED, ORIGINATOR)
                    .with_source(e)
                    .into())
            }
        }
    }
}

fn ensure_ok(status: StatusCode) -> Result<(), ProviderError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ProviderError::UnexpectedStatus(status))
    }
}
