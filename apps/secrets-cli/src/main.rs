// apps/secrets-cli/src/main.rs

use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use secrets_aws::{
    AesGcmProtector, AwsRepositories, CancellationToken, ConfigSource, DataProtector, EnvSource,
    JsonSource, PlaintextProtector, SecretRepository, SecretRepositoryError, ServiceLifetime,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn cli() -> Command {
    Command::new("secrets-cli")
        .about("Read and write secrets in AWS Secrets Manager")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Read settings from a JSON file instead of SECRETS_AWS_* variables"),
        )
        .arg(
            Arg::new("section")
                .long("section")
                .value_name("PATH")
                .default_value("Secrets/Aws")
                .global(true)
                .help("Section of the JSON file holding the settings"),
        )
        .arg(
            Arg::new("plaintext-config")
                .long("plaintext-config")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Credentials are stored unprotected (development only)"),
        )
        .subcommand(
            Command::new("get")
                .about("Print the current value of a secret")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("set")
                .about("Write a new value for a secret")
                .arg(name_arg())
                .arg(value_arg()),
        )
        .subcommand(
            Command::new("protect")
                .about("Protect a setting value with SECRETS_DATA_PROTECTION_KEY")
                .arg(value_arg()),
        )
        .subcommand(Command::new("generate-key").about("Print a new data protection key"))
}

fn name_arg() -> Arg {
    Arg::new("name")
        .long("name")
        .required(true)
        .help("Secret name or ARN")
}

fn value_arg() -> Arg {
    Arg::new("value").long("value").required(true)
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    if let Err(e) = run(&matches).await {
        if let Some(repo_err) = e
            .downcast_ref::<SecretRepositoryError>()
            .and_then(SecretRepositoryError::as_repository)
        {
            debug!(
                originator = repo_err.originator(),
                location = %repo_err.location(),
                timestamp = %repo_err.timestamp(),
                "Repository error context"
            );
        }
        eprintln!("Error: {}", report(e.as_ref()));
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> CliResult<()> {
    match matches.subcommand() {
        Some(("get", sub)) => {
            let repository = repository(sub).await?;
            let secret = repository
                .get_by_name(string_arg(sub, "name"), &cancel_on_ctrl_c())
                .await?;
            println!("{}\t{}", secret.key(), secret.value().expose_secret());
        }
        Some(("set", sub)) => {
            let repository = repository(sub).await?;
            let value = SecretString::new(string_arg(sub, "value").to_owned());
            let secret = repository
                .set_by_name(string_arg(sub, "name"), value, &cancel_on_ctrl_c())
                .await?;
            println!("{}", secret.key());
        }
        Some(("protect", sub)) => {
            let protector = AesGcmProtector::from_env()?;
            println!("{}", protector.protect(string_arg(sub, "value"))?);
        }
        Some(("generate-key", _)) => {
            println!("{}", AesGcmProtector::generate_key().as_str());
        }
        _ => return Err("unknown command".into()),
    }
    Ok(())
}

/// Render an error with every cause that its own message does not already show
fn report(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(source) = cause {
        let text = source.to_string();
        if !out.contains(&text) {
            out.push_str("\n  caused by: ");
            out.push_str(&text);
        }
        cause = source.source();
    }
    out
}

fn string_arg<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

async fn repository(matches: &ArgMatches) -> CliResult<Arc<dyn SecretRepository>> {
    let source: Box<dyn ConfigSource> = match matches.get_one::<String>("config") {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            Box::new(JsonSource::parse(&json, string_arg(matches, "section"))?)
        }
        None => Box::new(EnvSource::default()),
    };

    let protector: Option<&dyn DataProtector> = if matches.get_flag("plaintext-config") {
        warn!("Using unprotected credentials");
        Some(&PlaintextProtector)
    } else {
        None
    };

    let repositories =
        AwsRepositories::register(source.as_ref(), protector, ServiceLifetime::Singleton)?;
    Ok(repositories.secret_repository().await)
}

/// A token cancelled when the user hits Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            token.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrets_aws::{ProviderError, RepositoryError};

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_parse_set_with_global_config() {
        let matches = cli()
            .try_get_matches_from([
                "secrets-cli",
                "set",
                "--name",
                "db-password",
                "--value",
                "s3cr3t",
                "--config",
                "appsettings.json",
            ])
            .unwrap();

        let (command, sub) = matches.subcommand().unwrap();
        assert_eq!(command, "set");
        assert_eq!(string_arg(sub, "name"), "db-password");
        assert_eq!(string_arg(sub, "value"), "s3cr3t");
        assert_eq!(string_arg(sub, "config"), "appsettings.json");
        assert_eq!(string_arg(sub, "section"), "Secrets/Aws");
        assert!(!sub.get_flag("plaintext-config"));
    }

    #[derive(Debug)]
    struct DispatchFailure(std::io::Error);

    impl std::fmt::Display for DispatchFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dispatch failure")
        }
    }

    impl Error for DispatchFailure {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_report_shows_nested_cause() {
        let transport = ProviderError::Transport {
            message: "dispatch failure".to_string(),
            source: Box::new(DispatchFailure(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        };
        let err: Box<dyn Error> = Box::new(SecretRepositoryError::from(
            RepositoryError::new("failed to query the value of a secret, by name", "Tester")
                .with_source(transport),
        ));

        let printed = report(err.as_ref());
        assert!(printed.starts_with("failed to query the value of a secret, by name"));
        assert!(printed.contains("dispatch failure"));
        assert!(printed.contains("caused by: connection refused"));
        assert_eq!(printed.matches("dispatch failure").count(), 1);
    }

    #[test]
    fn test_report_without_cause_is_the_message() {
        let err: Box<dyn Error> = "unknown command".into();
        assert_eq!(report(err.as_ref()), "unknown command");
    }

    #[test]
    fn test_get_requires_name() {
        assert!(cli().try_get_matches_from(["secrets-cli", "get"]).is_err());
    }
}
