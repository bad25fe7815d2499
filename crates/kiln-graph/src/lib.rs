//! Kiln Graph - registry credentials for build graphs
//!
//! This crate classifies serialized registry credentials into the opaque,
//! vault-secret and managed-identity shapes, and resolves them into a login
//! lookup keyed by registry host.

pub mod credential;
pub mod error;
pub mod login;

pub use credential::{credentials_equal, CredentialKind, RegistryCredential, OPAQUE, VAULT_SECRET};
pub use error::{CredentialError, Result};
pub use login::{
    resolve_login_credentials, OpaqueSecretResolver, RegistryLoginCredential,
    RegistryLoginCredentials, SecretValue, SecretValueResolver,
};
