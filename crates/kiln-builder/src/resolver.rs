//! Registry resolution capability
//!
//! [`RegistryResolver`] turns a canonical reference into a content descriptor.
//! [`OciRegistryResolver`] implements it on top of `oci_client`, which owns the
//! distribution protocol and the registry auth handshake.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use oci_client::{secrets::RegistryAuth, Reference};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::ResolveError;

/// Returns the username and password to present to a registry host
pub type CredentialCallback =
    Arc<dyn Fn(&str) -> Result<(String, String), ResolveError> + Send + Sync>;

/// What a registry reports for a resolved reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Manifest digest in `algorithm:hex` form
    pub digest: String,
}

/// Resolves a canonical reference against its registry.
///
/// Implementations must not retry; failures are reported to the caller as-is.
#[async_trait]
pub trait RegistryResolver: Send + Sync {
    /// Resolve `reference`, asking `credentials` for a username and password
    /// for each host contacted. Without a callback the registry is accessed
    /// anonymously.
    async fn resolve(
        &self,
        reference: &str,
        credentials: Option<CredentialCallback>,
    ) -> Result<Descriptor, ResolveError>;
}

/// [`RegistryResolver`] backed by an `oci_client` client
pub struct OciRegistryResolver {
    client: oci_client::Client,
}

impl OciRegistryResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            client: oci_client::Client::new(config.client_config()),
        }
    }
}

impl Default for OciRegistryResolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl fmt::Debug for OciRegistryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OciRegistryResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryResolver for OciRegistryResolver {
    async fn resolve(
        &self,
        reference: &str,
        credentials: Option<CredentialCallback>,
    ) -> Result<Descriptor, ResolveError> {
        let image: Reference =
            reference
                .parse()
                .map_err(|e| ResolveError::InvalidReference {
                    reference: reference.to_string(),
                    reason: format!("{e}"),
                })?;

        let auth = match credentials {
            Some(callback) => {
                let (username, password) = callback(image.registry())?;
                RegistryAuth::Basic(username, password)
            }
            None => RegistryAuth::Anonymous,
        };

        debug!(
            reference = %reference,
            anonymous = matches!(auth, RegistryAuth::Anonymous),
            "fetching manifest digest"
        );

        let digest = self.client.fetch_manifest_digest(&image, &auth).await?;

        Ok(Descriptor { digest })
    }
}
