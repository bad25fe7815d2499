//! Credential error types
//!
//! Every variant is terminal for the call that produced it. Callers match on
//! the variant rather than on the message.

use thiserror::Error;

/// Errors produced while classifying or resolving registry credentials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The serialized credential could not be decoded
    #[error("unable to unmarshal credentials from string: {reason}")]
    MalformedInput { reason: String },

    #[error("registry name can't be empty")]
    MissingRegistry,

    #[error("username can't be empty")]
    MissingUsername,

    #[error("password can't be empty")]
    MissingPassword,

    #[error("identity can't be empty")]
    MissingIdentity,

    #[error("armResource can't be empty")]
    MissingArmResource,

    /// The provider types match none of the opaque, vault or msi shapes
    #[error("unable to classify credential into opaque, vault or msi")]
    UnclassifiableCredential,

    /// A declared secret value could not be turned into a concrete string
    #[error("unable to resolve secret for registry '{registry}': {reason}")]
    SecretResolutionFailed { registry: String, reason: String },
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput {
            reason: err.to_string(),
        }
    }
}

pub type Result<T, E = CredentialError> = std::result::Result<T, E>;
