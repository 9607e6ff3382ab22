//! Wiring: options → client → repository
//!
//! Hosts call [`AwsRepositories::register`] once at startup and resolve
//! `Arc<dyn SecretRepository>` from it, or from a [`ServiceScope`]. How many
//! remote clients get built is decided by the [`ServiceLifetime`].

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use secrecy::ExposeSecret;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ConfigSource, SecretRepositoryOptions};
use crate::protection::{AesGcmProtector, DataProtector};
use crate::remote::{AwsSecretsManager, SecretsManagerApi};
use crate::repository::{AwsSecretRepository, SecretRepository};
use crate::ConfigError;

const CREDENTIALS_PROVIDER: &str = "secrets-aws";

/// How long a constructed client is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceLifetime {
    /// One client for the whole registration
    Singleton,
    /// One client per [`ServiceScope`]
    #[default]
    Scoped,
    /// A new client for every resolution
    Transient,
}

/// Builds remote clients from bound options
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self, options: &SecretRepositoryOptions) -> Arc<dyn SecretsManagerApi>;
}

/// Builds AWS SDK clients with static credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsClientFactory;

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn create(&self, options: &SecretRepositoryOptions) -> Arc<dyn SecretsManagerApi> {
        Arc::new(AwsSecretsManager::new(create_client(options).await))
    }
}

/// Build an AWS Secrets Manager client from `options`
pub async fn create_client(options: &SecretRepositoryOptions) -> aws_sdk_secretsmanager::Client {
    let credentials = Credentials::new(
        options.access_key_id.expose_secret(),
        options.secret_access_key.expose_secret(),
        None,
        None,
        CREDENTIALS_PROVIDER,
    );

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(options.region.clone()))
        .credentials_provider(credentials)
        .load()
        .await;

    debug!(region = %options.region, "AWS Secrets Manager client created");
    aws_sdk_secretsmanager::Client::new(&config)
}

struct Registration {
    options: SecretRepositoryOptions,
    lifetime: ServiceLifetime,
    factory: Arc<dyn ClientFactory>,
    singleton: OnceCell<Arc<dyn SecretsManagerApi>>,
}

/// The AWS secret repository registration
pub struct AwsRepositories {
    registration: Arc<Registration>,
    root: ServiceScope,
}

impl AwsRepositories {
    /// Bind options from `source` and register the AWS repository.
    ///
    /// Protected settings are unprotected with `protector`, or with
    /// [`AesGcmProtector::from_env`] when none is given.
    pub fn register(
        source: &dyn ConfigSource,
        protector: Option<&dyn DataProtector>,
        lifetime: ServiceLifetime,
    ) -> Result<Self, ConfigError> {
        let options = match protector {
            Some(protector) => SecretRepositoryOptions::bind(source, protector)?,
            None => SecretRepositoryOptions::bind(source, &AesGcmProtector::from_env()?)?,
        };
        Ok(Self::new(options, lifetime))
    }

    pub fn new(options: SecretRepositoryOptions, lifetime: ServiceLifetime) -> Self {
        Self::with_client_factory(options, lifetime, Arc::new(AwsClientFactory))
    }

    pub fn with_client_factory(
        options: SecretRepositoryOptions,
        lifetime: ServiceLifetime,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        info!(region = %options.region, ?lifetime, "AWS secret repository registered");

        let registration = Arc::new(Registration {
            options,
            lifetime,
            factory,
            singleton: OnceCell::new(),
        });
        let root = ServiceScope::new(registration.clone());
        Self { registration, root }
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.registration.lifetime
    }

    pub fn options(&self) -> &SecretRepositoryOptions {
        &self.registration.options
    }

    /// Open a new scope
    pub fn scope(&self) -> ServiceScope {
        ServiceScope::new(self.registration.clone())
    }

    /// Resolve the repository from the root scope
    pub async fn secret_repository(&self) -> Arc<dyn SecretRepository> {
        self.root.secret_repository().await
    }
}

/// A resolution scope. Scoped clients live as long as the scope.
pub struct ServiceScope {
    registration: Arc<Registration>,
    client: OnceCell<Arc<dyn SecretsManagerApi>>,
}

impl ServiceScope {
    fn new(registration: Arc<Registration>) -> Self {
        Self {
            registration,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Arc<dyn SecretsManagerApi> {
        let registration = &self.registration;
        let create = || registration.factory.create(&registration.options);

        match registration.lifetime {
            ServiceLifetime::Singleton => registration.singleton.get_or_init(create).await.clone(),
            ServiceLifetime::Scoped => self.client.get_or_init(create).await.clone(),
            ServiceLifetime::Transient => create().await,
        }
    }

    pub async fn secret_repository(&self) -> Arc<dyn SecretRepository> {
        Arc::new(AwsSecretRepository::new(self.client().await))
    }
}
