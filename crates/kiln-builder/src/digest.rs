//! Base image digest population
//!
//! Before a build runs, every tag reference to a base image is pinned to the
//! manifest digest it currently points at. [`RemoteDigest`] asks the registry
//! for that digest, authenticating with the login credentials registered for
//! the reference's registry.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_graph::RegistryLoginCredentials;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::error::{DigestError, Result};
use crate::image::ImageReference;
use crate::resolver::{CredentialCallback, OciRegistryResolver, RegistryResolver};

/// Base image name meaning "build from nothing"
pub const NO_BASE_IMAGE_SPECIFIER: &str = "scratch";

/// [`NO_BASE_IMAGE_SPECIFIER`] as it appears in a normalized reference
pub const NO_BASE_IMAGE_SPECIFIER_LATEST: &str = "scratch:latest";

/// Fills in the digest of an image reference
#[async_trait]
pub trait DigestHelper: Send + Sync {
    /// Populate `reference.digest`.
    ///
    /// Absent references, references that already carry a digest and the
    /// no-base-image marker are left alone. The digest is only written after
    /// a complete, successful resolution.
    async fn populate_digest(
        &self,
        cancel: &CancellationToken,
        reference: Option<&mut ImageReference>,
    ) -> Result<()>;
}

/// Resolves digests against the remote registry
pub struct RemoteDigest<R = OciRegistryResolver> {
    registry_creds: RegistryLoginCredentials,
    resolver: R,
}

impl RemoteDigest<OciRegistryResolver> {
    /// Create a remote digest helper backed by an OCI client
    pub fn new(registry_creds: RegistryLoginCredentials, config: &ResolverConfig) -> Self {
        Self::with_resolver(registry_creds, OciRegistryResolver::new(config))
    }
}

impl<R: RegistryResolver> RemoteDigest<R> {
    /// Create a remote digest helper with a custom resolver
    pub fn with_resolver(registry_creds: RegistryLoginCredentials, resolver: R) -> Self {
        Self {
            registry_creds,
            resolver,
        }
    }

    pub fn credentials(&self) -> &RegistryLoginCredentials {
        &self.registry_creds
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Populate digests for several references in order.
    ///
    /// Stops at the first failure; references resolved before it keep their
    /// digests.
    pub async fn populate_digests(
        &self,
        cancel: &CancellationToken,
        references: &mut [ImageReference],
    ) -> Result<()> {
        for reference in references.iter_mut() {
            self.populate_digest(cancel, Some(reference)).await?;
        }
        Ok(())
    }

    /// Build the credential callback for `registry`.
    ///
    /// Returns `None` when no login is registered, which means anonymous
    /// access. A registered login must have both values resolved.
    fn credential_callback(&self, registry: &str) -> Result<Option<CredentialCallback>> {
        let Some(cred) = self.registry_creds.get(registry) else {
            debug!(registry = %registry, "no credentials registered, resolving anonymously");
            return Ok(None);
        };

        let username = cred.username.resolved_value();
        let password = cred.password.resolved_value();
        if username.is_empty() || password.is_empty() {
            return Err(DigestError::CredentialResolutionFailed {
                registry: registry.to_string(),
            });
        }

        let username = username.to_string();
        let password = password.to_string();

        // The same pair is answered for every host; one reference only ever
        // touches its own registry.
        let callback: CredentialCallback =
            Arc::new(move |_host: &str| Ok((username.clone(), password.clone())));

        Ok(Some(callback))
    }
}

#[async_trait]
impl<R: RegistryResolver> DigestHelper for RemoteDigest<R> {
    async fn populate_digest(
        &self,
        cancel: &CancellationToken,
        reference: Option<&mut ImageReference>,
    ) -> Result<()> {
        let Some(reference) = reference else {
            return Ok(());
        };

        if reference.has_digest() {
            debug!(reference = %reference.reference, "digest already populated");
            return Ok(());
        }

        if reference.reference == NO_BASE_IMAGE_SPECIFIER_LATEST {
            debug!("no base image, skipping digest resolution");
            return Ok(());
        }

        let credentials = self.credential_callback(&reference.registry)?;
        let image_ref = reference.reference_path()?;

        let descriptor = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                return Err(DigestError::Cancelled {
                    reference: reference.reference.clone(),
                });
            }
            result = self.resolver.resolve(&image_ref, credentials) => {
                result.map_err(|source| DigestError::ResolutionFailed {
                    reference: reference.reference.clone(),
                    source,
                })?
            }
        };

        info!(
            reference = %reference.reference,
            digest = %descriptor.digest,
            "resolved base image digest"
        );

        reference.digest = descriptor.digest;
        Ok(())
    }
}
