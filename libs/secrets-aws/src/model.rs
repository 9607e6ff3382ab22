//! The secret model returned by repositories

use secrecy::SecretString;

/// A named secret as reported by the provider for a single call.
///
/// Built fresh for every read or write and never mutated afterwards.
#[derive(Debug)]
pub struct Secret {
    key: String,
    name: String,
    value: SecretString,
}

impl Secret {
    pub fn new(key: impl Into<String>, name: impl Into<String>, value: SecretString) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            value,
        }
    }

    /// Provider-assigned identifier (the secret's ARN)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name the caller used to look the secret up
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SecretString {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_debug_redacts_value() {
        let secret = Secret::new(
            "arn:example:db-password",
            "db-password",
            SecretString::new("s3cr3t".to_string()),
        );

        let debug = format!("{secret:?}");
        assert!(debug.contains("db-password"));
        assert!(!debug.contains("s3cr3t"));
        assert_eq!(secret.value().expose_secret(), "s3cr3t");
    }
}
