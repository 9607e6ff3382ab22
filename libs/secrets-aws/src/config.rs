//! Configuration sources and repository options

use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use crate::protection::DataProtector;
use crate::ConfigError;

/// Setting holding the (protected) AWS access key id
pub const ACCESS_KEY_ID: &str = "AccessKeyId";
/// Setting holding the (protected) AWS secret access key
pub const SECRET_ACCESS_KEY: &str = "SecretAccessKey";
/// Setting holding the AWS region name
pub const REGION: &str = "Region";

/// Prefix used by [`EnvSource::default`]
pub const DEFAULT_ENV_PREFIX: &str = "SECRETS_AWS_";

/// A read-only source of named settings
pub trait ConfigSource: Send + Sync {
    /// Raw value of `setting`, `None` when absent
    fn get(&self, setting: &str) -> Option<String>;
}

/// Settings read from environment variables.
///
/// `AccessKeyId` with prefix `SECRETS_AWS_` reads `SECRETS_AWS_ACCESS_KEY_ID`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable backing `setting`
    pub fn variable(&self, setting: &str) -> String {
        let mut name = self.prefix.clone();
        for (i, c) in setting.chars().enumerate() {
            if c.is_uppercase() && i > 0 {
                name.push('_');
            }
            name.push(c.to_ascii_uppercase());
        }
        name
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, setting: &str) -> Option<String> {
        std::env::var(self.variable(setting)).ok()
    }
}

/// Settings read from a JSON object, e.g. a section of an `appsettings.json`
#[derive(Debug, Clone, Default)]
pub struct JsonSource {
    section: Value,
}

impl JsonSource {
    pub fn new(section: Value) -> Self {
        Self { section }
    }

    /// Parse `json` and select the object at `path` (`/`-separated, empty for the root)
    pub fn parse(json: &str, path: &str) -> Result<Self, serde_json::Error> {
        let document: Value = serde_json::from_str(json)?;
        let section = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(&document, |value, segment| value.get(segment))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Self { section })
    }
}

impl ConfigSource for JsonSource {
    fn get(&self, setting: &str) -> Option<String> {
        self.section
            .get(setting)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

/// Connection options for the AWS secret repository.
///
/// The credentials are protected at rest in configuration and only
/// unprotected by [`SecretRepositoryOptions::bind`].
#[derive(Debug)]
pub struct SecretRepositoryOptions {
    pub access_key_id: SecretString,
    pub secret_access_key: SecretString,
    pub region: String,
}

impl SecretRepositoryOptions {
    /// Read the options from `source`, unprotecting the credentials with `protector`
    pub fn bind(
        source: &dyn ConfigSource,
        protector: &dyn DataProtector,
    ) -> Result<Self, ConfigError> {
        let access_key_id = unprotect(protector, ACCESS_KEY_ID, &required(source, ACCESS_KEY_ID)?)?;
        let secret_access_key =
            unprotect(protector, SECRET_ACCESS_KEY, &required(source, SECRET_ACCESS_KEY)?)?;
        let region = required(source, REGION)?;

        debug!(region = %region, "Secret repository options bound");

        Ok(Self {
            access_key_id,
            secret_access_key,
            region,
        })
    }
}

fn required(source: &dyn ConfigSource, setting: &'static str) -> Result<String, ConfigError> {
    source
        .get(setting)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(setting))
}

fn unprotect(
    protector: &dyn DataProtector,
    setting: &'static str,
    protected: &str,
) -> Result<SecretString, ConfigError> {
    protector
        .unprotect(protected)
        .map_err(|source| ConfigError::Unprotect { setting, source })
}
