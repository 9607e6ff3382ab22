//! # AWS Secret Repository
//!
//! A secret repository backed by AWS Secrets Manager. Two operations,
//! each exactly one remote call:
//!
//! ```text
//! ┌──────────────┐   bind + unprotect   ┌──────────────────┐
//! │ ConfigSource │ ───────────────────▶ │ RepositoryOptions│
//! └──────────────┘                      └────────┬─────────┘
//!                                                │ ClientFactory
//!                                                ▼
//! ┌──────────────────────┐  get/put   ┌──────────────────────┐
//! │ dyn SecretRepository │ ─────────▶ │ AWS Secrets Manager  │
//! └──────────────────────┘            └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use secrets_aws::{AwsRepositories, CancellationToken, EnvSource, ServiceLifetime};
//! use secrecy::{ExposeSecret, SecretString};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials are unprotected with SECRETS_DATA_PROTECTION_KEY
//!     let repositories =
//!         AwsRepositories::register(&EnvSource::default(), None, ServiceLifetime::Singleton)?;
//!     let repository = repositories.secret_repository().await;
//!     let cancel = CancellationToken::new();
//!
//!     repository
//!         .set_by_name("db-password", SecretString::new("s3cr3t".into()), &cancel)
//!         .await?;
//!     let secret = repository.get_by_name("db-password", &cancel).await?;
//!     println!("{} = {}", secret.key(), secret.value().expose_secret());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod model;
mod protection;
mod registration;
mod remote;
mod repository;

pub use config::{
    ConfigSource, EnvSource, JsonSource, SecretRepositoryOptions, ACCESS_KEY_ID,
    DEFAULT_ENV_PREFIX, REGION, SECRET_ACCESS_KEY,
};
pub use error::{
    ConfigError, ProtectionError, ProviderError, RepositoryError, SecretRepositoryError,
};
pub use model::Secret;
pub use protection::{AesGcmProtector, DataProtector, PlaintextProtector, DATA_PROTECTION_KEY};
pub use registration::{
    create_client, AwsClientFactory, AwsRepositories, ClientFactory, ServiceLifetime,
    ServiceScope,
};
pub use remote::{
    AwsSecretsManager, GetSecretValueResponse, PutSecretValueResponse, SecretsManagerApi,
};
pub use repository::{AwsSecretRepository, SecretRepository};

pub use tokio_util::sync::CancellationToken;
