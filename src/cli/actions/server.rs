use crate::{
    broker::{self, AppState},
    claims::{
        ClaimsService, ClaimsSigner, IntrospectionVerifier, MemoryClaimsStore, StaticTokenVerifier,
        TokenVerifier,
    },
    cli::telemetry,
    pipeline::{Phase, Pipeline, PipelineConfig},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fmt::Write as _, path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub enum VerifierArgs {
    Introspection {
        url: String,
        client_id: String,
        client_secret: SecretString,
    },
    Static {
        tokens: PathBuf,
    },
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub pipeline_config: Option<PathBuf>,
    pub signing_key: PathBuf,
    pub signing_key_id: String,
    pub issuer: String,
    pub verifier: VerifierArgs,
    pub claims: PathBuf,
}

/// Build every component once, then serve until shutdown.
///
/// # Errors
///
/// Returns an error if any configuration file, key or endpoint is unusable, or
/// the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let state = build_state(&args)?;

    let result = broker::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

/// Load the pipeline, verifier, claims and signing key described by `args`.
///
/// # Errors
///
/// Fails on the first component that cannot be built.
pub fn build_state(args: &Args) -> Result<AppState> {
    let pipeline = match &args.pipeline_config {
        Some(path) => {
            let config = PipelineConfig::from_file(path)
                .with_context(|| format!("Could not load pipeline config {}", path.display()))?;
            Pipeline::from_config(&config).context("Invalid pipeline stage")?
        }
        None => Pipeline::default(),
    };
    info!(
        request_stages = pipeline.stages(Phase::Request).len(),
        response_stages = pipeline.stages(Phase::Response).len(),
        "pipeline ready"
    );

    let verifier: Arc<dyn TokenVerifier> = match &args.verifier {
        VerifierArgs::Introspection {
            url,
            client_id,
            client_secret,
        } => Arc::new(
            IntrospectionVerifier::new(url, client_id.clone(), client_secret.clone())
                .context("Could not configure token introspection")?,
        ),
        VerifierArgs::Static { tokens } => {
            let verifier = StaticTokenVerifier::from_file(tokens)
                .context("Could not load static access tokens")?;
            info!(tokens = verifier.len(), "static token verifier loaded");
            Arc::new(verifier)
        }
    };

    let (store, scopes) =
        MemoryClaimsStore::load(&args.claims).context("Could not load claims")?;
    info!(subjects = store.len(), "claims store loaded");

    let signer = ClaimsSigner::from_file(
        &args.signing_key,
        args.signing_key_id.clone(),
        args.issuer.clone(),
    )
    .context("Could not load signing key")?;

    Ok(AppState::new(
        Arc::new(pipeline),
        ClaimsService::new(verifier, Arc::new(store), scopes, signer),
    ))
}

fn log_startup_args(args: &Args) {
    info!("{}", startup_message(args));
}

fn startup_message(args: &Args) -> String {
    let verifier = match &args.verifier {
        VerifierArgs::Introspection { url, .. } => format!("introspection {url}"),
        VerifierArgs::Static { tokens } => format!("static {}", tokens.display()),
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "pipeline_config",
            args.pipeline_config
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
        ),
        ("issuer", args.issuer.clone()),
        ("signing_key_id", args.signing_key_id.clone()),
        ("verifier", verifier),
        ("claims", args.claims.display().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::GIT_COMMIT_HASH
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        if write!(message, "\n  {key}:{padding} {value}").is_err() {
            break;
        }
    }
    message
}
