//! The remote secrets service seam and its AWS Secrets Manager implementation

use async_trait::async_trait;
use aws_sdk_secretsmanager::config::http::HttpResponse;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client;
use http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ProviderError;

/// Response of a "get secret value" call
#[derive(Debug)]
pub struct GetSecretValueResponse {
    pub status: StatusCode,
    pub arn: Option<String>,
    pub secret_string: Option<SecretString>,
}

/// Response of a "put secret value" call
#[derive(Debug)]
pub struct PutSecretValueResponse {
    pub status: StatusCode,
    pub arn: Option<String>,
    pub version_id: Option<String>,
}

/// The two remote operations a secret repository needs.
///
/// Implement this trait to back the repository with another client
/// (or a mock in tests).
#[async_trait]
pub trait SecretsManagerApi: Send + Sync {
    /// Fetch the current value of a secret
    async fn get_secret_value(
        &self,
        secret_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GetSecretValueResponse, ProviderError>;

    /// Store a new current value for a secret
    async fn put_secret_value(
        &self,
        secret_id: &str,
        secret_string: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<PutSecretValueResponse, ProviderError>;
}

/// [`SecretsManagerApi`] over the AWS SDK client
#[derive(Debug, Clone)]
pub struct AwsSecretsManager {
    client: Client,
}

impl AwsSecretsManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretsManagerApi for AwsSecretsManager {
    async fn get_secret_value(
        &self,
        secret_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GetSecretValueResponse, ProviderError> {
        debug!(secret = %secret_id, "GetSecretValue");

        let request = self.client.get_secret_value().secret_id(secret_id).send();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = request => result.map_err(from_sdk_error)?,
        };

        // The SDK only deserializes an output for a successful response.
        Ok(GetSecretValueResponse {
            status: StatusCode::OK,
            arn: output.arn().map(str::to_owned),
            secret_string: output
                .secret_string()
                .map(|s| SecretString::new(s.to_owned())),
        })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        secret_string: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<PutSecretValueResponse, ProviderError> {
        debug!(secret = %secret_id, "PutSecretValue");

        let request = self
            .client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(secret_string.expose_secret())
            .send();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = request => result.map_err(from_sdk_error)?,
        };

        Ok(PutSecretValueResponse {
            status: StatusCode::OK,
            arn: output.arn().map(str::to_owned),
            version_id: output.version_id().map(str::to_owned),
        })
    }
}

fn from_sdk_error<E>(err: SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(context) => {
            let status = StatusCode::from_u16(context.raw().status().as_u16())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let service_err = context.into_err();
            ProviderError::Service {
                status,
                code: service_err.code().unwrap_or("Unknown").to_owned(),
                message: service_err.message().unwrap_or_default().to_owned(),
                source: Box::new(service_err),
            }
        }
        other => ProviderError::Transport {
            message: DisplayErrorContext(&other).to_string(),
            source: Box::new(other),
        },
    }
}
