//! Kiln Builder - base image digest resolution
//!
//! Pins base image tag references to manifest digests before a build runs,
//! using the registry login credentials produced by `kiln-graph`.

pub mod config;
pub mod digest;
pub mod error;
pub mod image;
pub mod resolver;

pub use config::{Protocol, ResolverConfig};
pub use digest::{DigestHelper, RemoteDigest, NO_BASE_IMAGE_SPECIFIER, NO_BASE_IMAGE_SPECIFIER_LATEST};
pub use error::{ConfigError, DigestError, ResolveError, Result};
pub use image::{ImageReference, DEFAULT_REGISTRY, DEFAULT_TAG};
pub use resolver::{CredentialCallback, Descriptor, OciRegistryResolver, RegistryResolver};

// Re-export so callers can build cancellation tokens without a direct dependency
pub use tokio_util::sync::CancellationToken;
