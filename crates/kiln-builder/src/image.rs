//! Image references as they appear in build definitions

use std::fmt;

use oci_client::Reference;

use crate::error::{DigestError, Result};

/// Registry assumed when a reference names none
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when a reference names none
pub const DEFAULT_TAG: &str = "latest";

/// A base image reference.
///
/// `digest` starts empty for tag references and is filled in once by a
/// [`DigestHelper`](crate::DigestHelper).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageReference {
    /// Registry host (e.g., "docker.io", "myregistry.azurecr.io")
    pub registry: String,
    /// Repository path (e.g., "library/ubuntu")
    pub repository: String,
    /// Tag, empty when the reference names none
    pub tag: String,
    /// Content digest in `algorithm:hex` form
    pub digest: String,
    /// The reference as written, used in messages
    pub reference: String,
}

impl ImageReference {
    /// Build a reference from its parts; the display string is derived from them
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let registry = registry.into();
        let repository = repository.into();
        let tag = tag.into();
        let reference = if tag.is_empty() {
            format!("{registry}/{repository}")
        } else {
            format!("{registry}/{repository}:{tag}")
        };

        Self {
            registry,
            repository,
            tag,
            digest: String::new(),
            reference,
        }
    }

    /// Parse a user-supplied image string.
    ///
    /// Examples:
    /// - "ubuntu" -> docker.io, library/ubuntu, no tag
    /// - "myorg/app:v1" -> docker.io, myorg/app, v1
    /// - "localhost:5000/app" -> localhost:5000, app, no tag
    /// - "r.io/app@sha256:..." -> r.io, app, digest already set
    ///
    /// A reference with neither tag nor digest is recorded with an explicit
    /// `:latest` so it compares equal to its tagged spelling.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "empty image reference"));
        }

        let (name, digest) = match input.split_once('@') {
            Some((name, digest)) => match digest.split_once(':') {
                Some((algorithm, hex)) if !algorithm.is_empty() && !hex.is_empty() => {
                    (name, digest.to_string())
                }
                _ => return Err(invalid(input, "digest must be in algorithm:hex form")),
            },
            None => (input, String::new()),
        };

        if name.ends_with(':') {
            return Err(invalid(input, "empty tag"));
        }

        let (name, tag) = split_tag(name);
        if !digest.is_empty() && !tag.is_empty() {
            return Err(invalid(input, "cannot combine tag and digest"));
        }
        if name.is_empty() {
            return Err(invalid(input, "empty repository name"));
        }

        let (registry, repository) = split_registry(name);
        if registry.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(invalid(input, "empty path component"));
        }

        let reference = if tag.is_empty() && digest.is_empty() {
            format!("{input}:{DEFAULT_TAG}")
        } else {
            input.to_string()
        };

        Ok(Self {
            registry,
            repository,
            tag: tag.to_string(),
            digest,
            reference,
        })
    }

    /// The fully qualified `registry/repository:tag` path, canonicalized by the
    /// OCI reference grammar. An empty tag becomes `latest`.
    pub fn reference_path(&self) -> Result<String> {
        let tag = if self.tag.is_empty() {
            DEFAULT_TAG
        } else {
            &self.tag
        };
        let path = format!("{}/{}:{}", self.registry, self.repository, tag);

        let parsed: Reference = path
            .parse()
            .map_err(|e| invalid(&self.reference, &format!("{e}")))?;

        Ok(parsed.whole())
    }

    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digest.is_empty() {
            write!(f, "{}", self.reference)
        } else {
            write!(f, "{}/{}@{}", self.registry, self.repository, self.digest)
        }
    }
}

fn invalid(reference: &str, reason: &str) -> DigestError {
    DigestError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

/// Split off the tag, leaving registry ports alone
fn split_tag(name: &str) -> (&str, &str) {
    match name.rfind(':') {
        // A colon before the last slash belongs to a registry port
        Some(pos) if !name[pos + 1..].contains('/') => (&name[..pos], &name[pos + 1..]),
        _ => (name, ""),
    }
}

/// Split the registry host from the repository path
fn split_registry(name: &str) -> (String, String) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        Some(_) => (DEFAULT_REGISTRY.to_string(), name.to_string()),
        None => (DEFAULT_REGISTRY.to_string(), format!("library/{name}")),
    }
}
