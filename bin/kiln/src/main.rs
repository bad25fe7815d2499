//! kiln: registry credential and base image digest tool
//!
//! Thin CLI over `kiln-graph` and `kiln-builder`, providing two subcommands:
//! `classify` and `resolve`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use kiln_builder::{CancellationToken, DigestHelper, ImageReference, RemoteDigest, ResolverConfig};
use kiln_graph::{resolve_login_credentials, OpaqueSecretResolver, RegistryCredential};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Classify registry credentials and pin base images to digests
#[derive(Parser)]
#[command(name = "kiln", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a serialized registry credential and print its normalized form
    Classify(ClassifyArgs),
    /// Resolve an image reference to its manifest digest
    Resolve(ResolveArgs),
}

#[derive(Parser)]
struct ClassifyArgs {
    /// Credential JSON (read from --file if omitted)
    #[arg(conflicts_with = "file")]
    credential: Option<String>,

    /// Read the credential JSON from a file
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Print the password instead of redacting it
    #[arg(long)]
    show_secrets: bool,
}

#[derive(Parser)]
struct ResolveArgs {
    /// Image reference (e.g. myregistry.azurecr.io/app:v1)
    image: String,

    /// Credential JSON for a registry (repeatable)
    #[arg(short = 'c', long = "credential", env = "KILN_REGISTRY_CREDENTIAL")]
    credential: Vec<String>,

    /// Resolver configuration file (YAML)
    #[arg(long, default_value = "kiln.yaml")]
    config: PathBuf,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Classify(args) => cmd_classify(args),
        Commands::Resolve(args) => cmd_resolve(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// classify subcommand
// ---------------------------------------------------------------------------

fn cmd_classify(args: ClassifyArgs) -> Result<()> {
    let raw = match (args.credential, args.file) {
        (Some(raw), _) => raw,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read credential file {}", path.display()))?,
        (None, None) => bail!("Provide a credential JSON argument or --file"),
    };

    let cred = RegistryCredential::from_json(&raw).context("Invalid registry credential")?;
    info!(registry = %cred.registry(), kind = %cred.kind(), "credential classified");

    let mut value = serde_json::to_value(&cred)?;
    if !args.show_secrets {
        if let Some(password) = value.get_mut("password") {
            *password = serde_json::Value::String("[REDACTED]".to_string());
        }
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// resolve subcommand
// ---------------------------------------------------------------------------

async fn cmd_resolve(args: ResolveArgs) -> Result<()> {
    let config = ResolverConfig::load_from_path(&args.config)?;

    let creds = args
        .credential
        .iter()
        .map(|raw| RegistryCredential::from_json(raw))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid registry credential")?;

    let logins = resolve_login_credentials(&creds, &OpaqueSecretResolver)
        .await
        .context("Failed to resolve registry credentials")?;

    let mut reference = ImageReference::parse(&args.image)?;
    let helper = RemoteDigest::new(logins, &config);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = helper.populate_digest(&cancel, Some(&mut reference)).await;
    ctrl_c.abort();
    result?;

    if reference.has_digest() {
        println!("{}", reference.digest);
    } else {
        info!(reference = %reference.reference, "no digest to resolve");
    }
    Ok(())
}
