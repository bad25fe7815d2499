//! Resolved registry login credentials
//!
//! A [`RegistryCredential`] only declares where a username and password come
//! from. Before a registry client can use them, each value is resolved into a
//! concrete string by a [`SecretValueResolver`]. The result is a
//! [`RegistryLoginCredentials`] lookup keyed by registry host.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::credential::{CredentialKind, RegistryCredential, OPAQUE};
use crate::error::{CredentialError, Result};

/// A username or password as declared, together with its resolved value.
///
/// The resolved value is held in a [`SecretString`] and never shows up in
/// `Debug` output.
#[derive(Clone)]
pub struct SecretValue {
    declared: String,
    provider_type: String,
    resolved: Option<SecretString>,
}

impl SecretValue {
    /// A declared value that has not been resolved yet
    pub fn new(declared: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            declared: declared.into(),
            provider_type: provider_type.into(),
            resolved: None,
        }
    }

    /// A plain-text value, resolved to itself
    pub fn opaque(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            resolved: Some(SecretString::from(value.clone())),
            declared: value,
            provider_type: OPAQUE.to_string(),
        }
    }

    /// Attach the resolved value
    #[must_use]
    pub fn with_resolved_value(mut self, resolved: impl Into<String>) -> Self {
        self.resolved = Some(SecretString::from(resolved.into()));
        self
    }

    /// The value as written in the credential (a literal or a vault reference)
    pub fn declared(&self) -> &str {
        &self.declared
    }

    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    /// The resolved value, or the empty string if resolution has not happened
    pub fn resolved_value(&self) -> &str {
        self.resolved
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("provider_type", &self.provider_type)
            .field("resolved", &self.resolved.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Username and password for one registry, ready to be handed to a client
#[derive(Debug, Clone)]
pub struct RegistryLoginCredential {
    pub username: SecretValue,
    pub password: SecretValue,
    pub identity: String,
}

impl RegistryLoginCredential {
    /// Build a login from plain-text values
    pub fn opaque(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: SecretValue::opaque(username),
            password: SecretValue::opaque(password),
            identity: String::new(),
        }
    }

    /// Build an unresolved login from a classified credential
    pub fn from_credential(cred: &RegistryCredential) -> Self {
        Self {
            username: SecretValue::new(cred.username(), cred.username_type()),
            password: SecretValue::new(cred.password(), cred.password_type()),
            identity: cred.identity().to_string(),
        }
    }
}

/// Resolved login credentials keyed by registry host
pub type RegistryLoginCredentials = HashMap<String, RegistryLoginCredential>;

/// Turns a declared secret value into the concrete string it stands for.
///
/// Implementations wrap whatever backs the value: the literal itself for
/// opaque values, a key vault for vault-secret values.
#[async_trait]
pub trait SecretValueResolver: Send + Sync {
    /// Resolve `value` for `registry`, authenticating as `identity` where the
    /// backend needs one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::SecretResolutionFailed`] if the value cannot
    /// be produced.
    async fn resolve(&self, registry: &str, identity: &str, value: &SecretValue)
        -> Result<String>;
}

/// Resolves opaque values to themselves and rejects everything else
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueSecretResolver;

#[async_trait]
impl SecretValueResolver for OpaqueSecretResolver {
    async fn resolve(
        &self,
        registry: &str,
        _identity: &str,
        value: &SecretValue,
    ) -> Result<String> {
        if value.provider_type() == OPAQUE {
            Ok(value.declared().to_string())
        } else {
            Err(CredentialError::SecretResolutionFailed {
                registry: registry.to_string(),
                reason: format!(
                    "no resolver configured for provider type '{}'",
                    value.provider_type()
                ),
            })
        }
    }
}

/// Resolve every username/password credential into a login lookup.
///
/// Managed-identity credentials carry no username or password and are left
/// out. When two credentials name the same registry the later one wins.
///
/// # Errors
///
/// Returns the first error reported by `resolver`.
pub async fn resolve_login_credentials<R>(
    creds: &[RegistryCredential],
    resolver: &R,
) -> Result<RegistryLoginCredentials>
where
    R: SecretValueResolver + ?Sized,
{
    let mut logins = RegistryLoginCredentials::with_capacity(creds.len());

    for cred in creds {
        if cred.kind() == CredentialKind::ManagedIdentity {
            debug!(registry = %cred.registry(), "skipping managed identity credential");
            continue;
        }

        let login = RegistryLoginCredential::from_credential(cred);
        let username = resolver
            .resolve(cred.registry(), cred.identity(), &login.username)
            .await?;
        let password = resolver
            .resolve(cred.registry(), cred.identity(), &login.password)
            .await?;

        debug!(registry = %cred.registry(), kind = %cred.kind(), "resolved login credential");

        let login = RegistryLoginCredential {
            username: login.username.with_resolved_value(username),
            password: login.password.with_resolved_value(password),
            identity: login.identity,
        };
        logins.insert(cred.registry().to_string(), login);
    }

    Ok(logins)
}
