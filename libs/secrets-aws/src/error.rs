//! Error types for the secrets library

use std::panic::Location;

use chrono::{DateTime, Utc};
use http::StatusCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by a [`SecretRepository`](crate::SecretRepository)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SecretRepositoryError {
    /// A required argument was missing or empty. Raised before any remote call.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },

    /// The repository operation failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SecretRepositoryError {
    pub(crate) fn empty_argument(argument: &'static str) -> Self {
        SecretRepositoryError::InvalidArgument {
            argument,
            reason: "must not be empty",
        }
    }

    /// The wrapped repository error, if this is one
    pub fn as_repository(&self) -> Option<&RepositoryError> {
        match self {
            SecretRepositoryError::Repository(e) => Some(e),
            SecretRepositoryError::InvalidArgument { .. } => None,
        }
    }
}

/// Failure of a repository operation, with the context of where it happened.
///
/// The original failure is always kept as [`source`](std::error::Error::source).
#[derive(Debug)]
pub struct RepositoryError {
    message: String,
    originator: &'static str,
    location: &'static Location<'static>,
    timestamp: DateTime<Utc>,
    source: Option<BoxError>,
}

impl RepositoryError {
    /// Build an error stamped with the caller's location and the current time
    #[track_caller]
    pub fn new(message: impl Into<String>, originator: &'static str) -> Self {
        Self {
            message: message.into(),
            originator,
            location: Location::caller(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    /// Chain the original failure
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the component that raised the error
    pub fn originator(&self) -> &'static str {
        self.originator
    }

    /// Source location that raised the error
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors raised while talking to the remote secrets service
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProviderError {
    /// The service answered, but not with 200 OK
    #[error("the call to AWS failed with status code: {0}")]
    UnexpectedStatus(StatusCode),

    /// The service rejected the request
    #[error("AWS returned {status} ({code}): {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
        #[source]
        source: BoxError,
    },

    /// The request never produced a service response
    #[error("request to AWS failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },

    /// An OK response without a field we need
    #[error("AWS response is missing `{0}`")]
    MissingField(&'static str),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,
}

/// Errors raised while protecting or unprotecting configuration values
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProtectionError {
    #[error("data protection key is invalid: {0}")]
    InvalidKey(String),

    #[error("data protection key not set, expected environment variable {0}")]
    MissingKey(&'static str),

    #[error("protected value is malformed: {0}")]
    Malformed(String),

    #[error("failed to protect value")]
    EncryptionFailed,

    /// Wrong key or tampered payload
    #[error("failed to unprotect value")]
    DecryptionFailed,

    #[error("unprotected value is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised while binding repository options
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing configuration setting: {0}")]
    Missing(&'static str),

    #[error("failed to unprotect setting {setting}: {source}")]
    Unprotect {
        setting: &'static str,
        #[source]
        source: ProtectionError,
    },

    #[error(transparent)]
    Protection(#[from] ProtectionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_repository_error_chains_source() {
        let err = RepositoryError::new("failed to do the thing", "Tester")
            .with_source(ProviderError::UnexpectedStatus(StatusCode::NOT_FOUND));

        let source = err.source().expect("source should be chained");
        assert!(source.to_string().contains("404"));
        assert!(err.to_string().starts_with("failed to do the thing: "));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_repository_error_records_call_site() {
        let line = line!() + 1;
        let err = RepositoryError::new("boom", "Tester");

        assert_eq!(err.originator(), "Tester");
        assert_eq!(err.location().file(), file!());
        assert_eq!(err.location().line(), line);
        assert!(err.timestamp() <= Utc::now());
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_invalid_argument_is_not_a_repository_error() {
        let err = SecretRepositoryError::empty_argument("name");

        assert!(err.as_repository().is_none());
        assert_eq!(err.to_string(), "invalid argument `name`: must not be empty");
    }
}
