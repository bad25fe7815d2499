//! Builder error types

use std::path::PathBuf;

use oci_client::errors::OciDistributionError;
use thiserror::Error;

/// Errors raised while resolving a base image digest.
///
/// None of these are retried. On any of them the reference's digest is left
/// untouched.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Credentials are registered for the registry but did not resolve to a
    /// usable username and password
    #[error("error fetching credentials for '{registry}'")]
    CredentialResolutionFailed { registry: String },

    /// The qualified reference is rejected by the reference grammar
    #[error("failed to parse the reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The registry could not resolve the reference
    #[error("failed to resolve the reference '{reference}': {source}")]
    ResolutionFailed {
        reference: String,
        #[source]
        source: ResolveError,
    },

    /// The caller cancelled the resolution before it completed
    #[error("resolution of '{reference}' was cancelled")]
    Cancelled { reference: String },
}

/// Errors reported by a [`RegistryResolver`](crate::RegistryResolver)
#[derive(Debug, Error)]
pub enum ResolveError {
    /// OCI distribution error
    #[error("OCI distribution error: {0}")]
    Oci(#[from] OciDistributionError),

    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The credential callback refused to produce credentials for a host
    #[error("unable to get credentials for registry {registry}: {reason}")]
    Credentials { registry: String, reason: String },
}

/// Resolver configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T, E = DigestError> = std::result::Result<T, E>;
