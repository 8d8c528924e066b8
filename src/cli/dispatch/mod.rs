use crate::cli::actions::{
    server::{Args, VerifierArgs},
    Action,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

fn path_arg(matches: &clap::ArgMatches, name: &str) -> Option<PathBuf> {
    matches.get_one::<String>(name).map(PathBuf::from)
}

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let verifier = if let Some(url) = matches.get_one::<String>("introspection-url") {
        VerifierArgs::Introspection {
            url: url.clone(),
            client_id: matches
                .get_one::<String>("introspection-client-id")
                .cloned()
                .context("missing required argument: --introspection-client-id")?,
            client_secret: matches
                .get_one::<String>("introspection-client-secret")
                .cloned()
                .map(SecretString::from)
                .context("missing required argument: --introspection-client-secret")?,
        }
    } else {
        VerifierArgs::Static {
            tokens: path_arg(matches, "tokens")
                .context("missing required argument: --tokens or --introspection-url")?,
        }
    };

    Ok(Action::Server(Args {
        port,
        pipeline_config: path_arg(matches, "pipeline-config"),
        signing_key: path_arg(matches, "signing-key")
            .context("missing required argument: --signing-key")?,
        signing_key_id: matches
            .get_one::<String>("signing-key-id")
            .cloned()
            .unwrap_or_else(|| "oidc2fer".to_string()),
        issuer: matches
            .get_one::<String>("issuer")
            .cloned()
            .context("missing required argument: --issuer")?,
        verifier,
        claims: path_arg(matches, "claims").context("missing required argument: --claims")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn base() -> Vec<&'static str> {
        vec![
            "oidc2fer",
            "--port",
            "9090",
            "--signing-key",
            "key.pem",
            "--issuer",
            "https://oidc2fer.example.fr",
            "--claims",
            "claims.json",
        ]
    }

    #[test]
    fn dispatches_static_verifier() -> Result<()> {
        let mut argv = base();
        argv.extend(["--tokens", "tokens.json", "--pipeline-config", "pipeline.json"]);
        let matches = commands::new().try_get_matches_from(argv)?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9090);
        assert_eq!(args.signing_key, PathBuf::from("key.pem"));
        assert_eq!(args.pipeline_config, Some(PathBuf::from("pipeline.json")));
        assert!(matches!(
            args.verifier,
            VerifierArgs::Static { ref tokens } if tokens == &PathBuf::from("tokens.json")
        ));
        Ok(())
    }

    #[test]
    fn dispatches_introspection_verifier() -> Result<()> {
        let mut argv = base();
        argv.extend([
            "--introspection-url",
            "https://auth.example.fr/introspect",
            "--introspection-client-id",
            "oidc2fer",
            "--introspection-client-secret",
            "s3cret",
        ]);
        let matches = commands::new().try_get_matches_from(argv)?;

        let Action::Server(args) = handler(&matches)?;
        match args.verifier {
            VerifierArgs::Introspection {
                url,
                client_id,
                client_secret,
            } => {
                assert_eq!(url, "https://auth.example.fr/introspect");
                assert_eq!(client_id, "oidc2fer");
                assert_eq!(client_secret.expose_secret(), "s3cret");
            }
            VerifierArgs::Static { .. } => anyhow::bail!("expected introspection verifier"),
        }
        assert!(args.pipeline_config.is_none());
        Ok(())
    }
}
