//! Registry credential classification
//!
//! A serialized credential blob is decoded and classified into exactly one of
//! three authentication shapes:
//!
//! - **opaque**: username and password are plain text
//! - **vault secret**: username and password are references into a secret
//!   store, resolved before they reach the registry client
//! - **managed identity**: no username or password; a platform identity bound
//!   to a resource identifier authenticates instead
//!
//! A [`RegistryCredential`] can only be built through classification, so every
//! instance satisfies the required-field set of its shape.

use std::fmt;
use std::str::FromStr;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CredentialError, Result};

/// Provider type for plain-text usernames and passwords
pub const OPAQUE: &str = "opaque";

/// Provider type for usernames and passwords held in a secret vault
pub const VAULT_SECRET: &str = "vaultsecret";

/// Authentication shape of a classified credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Opaque,
    VaultSecret,
    ManagedIdentity,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque => write!(f, "opaque"),
            Self::VaultSecret => write!(f, "vault secret"),
            Self::ManagedIdentity => write!(f, "managed identity"),
        }
    }
}

/// Credential blob as it appears on the wire, before validation.
///
/// Every key is optional at this stage; absent and `null` values both decode
/// to the empty string. Only a JSON object is accepted.
#[derive(Debug, Default)]
struct RawCredential {
    registry: Option<String>,
    username: Option<String>,
    username_type: Option<String>,
    password: Option<String>,
    password_type: Option<String>,
    identity: Option<String>,
    arm_resource: Option<String>,
}

impl<'de> Deserialize<'de> for RawCredential {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RawCredentialVisitor)
    }
}

struct RawCredentialVisitor;

impl<'de> Visitor<'de> for RawCredentialVisitor {
    type Value = RawCredential;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a registry credential object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut raw = RawCredential::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                "registry" => &mut raw.registry,
                "username" => &mut raw.username,
                "userNameProviderType" => &mut raw.username_type,
                "password" => &mut raw.password,
                "passwordProviderType" => &mut raw.password_type,
                "identity" => &mut raw.identity,
                "armResource" => &mut raw.arm_resource,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            // Repeated keys: the last value wins
            *slot = map.next_value()?;
        }
        Ok(raw)
    }
}

/// Authentication material for a single registry host.
///
/// Equality compares every field. Use [`credentials_equal`] when either side
/// may be absent.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegistryCredential {
    registry: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    username: String,
    #[serde(rename = "userNameProviderType", skip_serializing_if = "String::is_empty")]
    username_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    password: String,
    #[serde(rename = "passwordProviderType", skip_serializing_if = "String::is_empty")]
    password_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    identity: String,
    #[serde(rename = "armResource", skip_serializing_if = "String::is_empty")]
    arm_resource: String,
}

impl RegistryCredential {
    /// Decode and classify a serialized credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MalformedInput`] if the blob is not a valid
    /// credential object, otherwise the first missing-field error of the
    /// detected shape, or [`CredentialError::UnclassifiableCredential`].
    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawCredential = serde_json::from_str(raw)?;
        Self::classify(raw)
    }

    fn classify(raw: RawCredential) -> Result<Self> {
        let username_type = raw.username_type.unwrap_or_default().to_lowercase();
        let password_type = raw.password_type.unwrap_or_default().to_lowercase();

        let registry = raw.registry.unwrap_or_default();
        if registry.is_empty() {
            return Err(CredentialError::MissingRegistry);
        }

        let username = raw.username.unwrap_or_default();
        let password = raw.password.unwrap_or_default();
        let identity = raw.identity.unwrap_or_default();
        let arm_resource = raw.arm_resource.unwrap_or_default();

        let is_opaque = username_type == OPAQUE && password_type == OPAQUE;
        let has_vault_secret = username_type == VAULT_SECRET || password_type == VAULT_SECRET;
        let is_msi = username_type.is_empty() && password_type.is_empty();

        if is_opaque {
            require(&username, CredentialError::MissingUsername)?;
            require(&password, CredentialError::MissingPassword)?;
            Ok(Self {
                registry,
                username,
                username_type,
                password,
                password_type,
                identity: String::new(),
                arm_resource: String::new(),
            })
        } else if has_vault_secret {
            require(&username, CredentialError::MissingUsername)?;
            require(&password, CredentialError::MissingPassword)?;
            require(&identity, CredentialError::MissingIdentity)?;
            Ok(Self {
                registry,
                username,
                username_type,
                password,
                password_type,
                identity,
                arm_resource: String::new(),
            })
        } else if is_msi {
            require(&identity, CredentialError::MissingIdentity)?;
            require(&arm_resource, CredentialError::MissingArmResource)?;
            Ok(Self {
                registry,
                username: String::new(),
                username_type: String::new(),
                password: String::new(),
                password_type: String::new(),
                identity,
                arm_resource,
            })
        } else {
            Err(CredentialError::UnclassifiableCredential)
        }
    }

    /// Registry hostname this credential authenticates against
    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Lowercased username provider type (`opaque`, `vaultsecret` or empty)
    pub fn username_type(&self) -> &str {
        &self.username_type
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Lowercased password provider type (`opaque`, `vaultsecret` or empty)
    pub fn password_type(&self) -> &str {
        &self.password_type
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn arm_resource(&self) -> &str {
        &self.arm_resource
    }

    /// The authentication shape this credential was classified into
    pub fn kind(&self) -> CredentialKind {
        if self.username_type == OPAQUE && self.password_type == OPAQUE {
            CredentialKind::Opaque
        } else if self.username_type == VAULT_SECRET || self.password_type == VAULT_SECRET {
            CredentialKind::VaultSecret
        } else {
            CredentialKind::ManagedIdentity
        }
    }
}

fn require(value: &str, missing: CredentialError) -> Result<()> {
    if value.is_empty() {
        Err(missing)
    } else {
        Ok(())
    }
}

impl<'de> Deserialize<'de> for RegistryCredential {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawCredential::deserialize(deserializer)?;
        Self::classify(raw).map_err(serde::de::Error::custom)
    }
}

impl FromStr for RegistryCredential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}

impl fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("RegistryCredential")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("username_type", &self.username_type)
            .field("password", &password)
            .field("password_type", &self.password_type)
            .field("identity", &self.identity)
            .field("arm_resource", &self.arm_resource)
            .finish()
    }
}

/// Compare two possibly-absent credentials.
///
/// Two absent credentials are equal; an absent and a present one never are.
pub fn credentials_equal(a: Option<&RegistryCredential>, b: Option<&RegistryCredential>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> Result<RegistryCredential> {
        RegistryCredential::from_json(raw)
    }

    #[test]
    fn test_opaque_credential() {
        let cred = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"Opaque","password":"p","passwordProviderType":"opaque"}"#,
        )
        .unwrap();

        assert_eq!(cred.registry(), "r.io");
        assert_eq!(cred.username(), "u");
        assert_eq!(cred.password(), "p");
        assert_eq!(cred.username_type(), "opaque");
        assert_eq!(cred.password_type(), "opaque");
        assert_eq!(cred.identity(), "");
        assert_eq!(cred.arm_resource(), "");
        assert_eq!(cred.kind(), CredentialKind::Opaque);
    }

    #[test]
    fn test_opaque_drops_identity_and_arm_resource() {
        let cred = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","password":"p","passwordProviderType":"OPAQUE","identity":"id","armResource":"/subscriptions/x"}"#,
        )
        .unwrap();

        assert_eq!(cred.identity(), "");
        assert_eq!(cred.arm_resource(), "");
    }

    #[test]
    fn test_opaque_missing_fields() {
        let err = classify(
            r#"{"registry":"r.io","userNameProviderType":"opaque","password":"p","passwordProviderType":"opaque"}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingUsername);

        let err = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","passwordProviderType":"opaque"}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingPassword);
    }

    #[test]
    fn test_vault_secret_credential() {
        let cred = classify(
            r#"{"registry":"r.io","username":"https://v/secrets/u","userNameProviderType":"vaultsecret","password":"https://v/secrets/p","passwordProviderType":"VaultSecret","identity":"client-id","armResource":"ignored"}"#,
        )
        .unwrap();

        assert_eq!(cred.kind(), CredentialKind::VaultSecret);
        assert_eq!(cred.identity(), "client-id");
        assert_eq!(cred.arm_resource(), "");
        assert_eq!(cred.password_type(), "vaultsecret");
    }

    #[test]
    fn test_mixed_opaque_and_vault_secret_is_vault() {
        let cred = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","password":"https://v/secrets/p","passwordProviderType":"vaultsecret","identity":"client-id"}"#,
        )
        .unwrap();

        assert_eq!(cred.kind(), CredentialKind::VaultSecret);
        assert_eq!(cred.username_type(), "opaque");
        assert_eq!(cred.password_type(), "vaultsecret");
    }

    #[test]
    fn test_vault_secret_required_fields_in_order() {
        // username is reported before password and identity
        let err = classify(
            r#"{"registry":"r.io","userNameProviderType":"vaultsecret","passwordProviderType":""}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingUsername);

        let err = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"","passwordProviderType":"vaultsecret"}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingPassword);

        let err = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"vaultsecret","password":"p","passwordProviderType":"opaque"}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingIdentity);
    }

    #[test]
    fn test_managed_identity_credential() {
        let cred = classify(
            r#"{"registry":"r.io","username":"u","password":"p","identity":"client-id","armResource":"/subscriptions/s/resourceGroups/g"}"#,
        )
        .unwrap();

        assert_eq!(cred.kind(), CredentialKind::ManagedIdentity);
        assert_eq!(cred.username(), "");
        assert_eq!(cred.password(), "");
        assert_eq!(cred.identity(), "client-id");
        assert_eq!(cred.arm_resource(), "/subscriptions/s/resourceGroups/g");
    }

    #[test]
    fn test_managed_identity_missing_identity() {
        let err = classify(r#"{"registry":"r.io","userNameProviderType":"","passwordProviderType":""}"#)
            .unwrap_err();
        assert_eq!(err, CredentialError::MissingIdentity);
    }

    #[test]
    fn test_managed_identity_missing_arm_resource() {
        let err = classify(r#"{"registry":"r.io","identity":"client-id"}"#).unwrap_err();
        assert_eq!(err, CredentialError::MissingArmResource);
    }

    #[test]
    fn test_missing_registry() {
        assert_eq!(classify("{}").unwrap_err(), CredentialError::MissingRegistry);

        // Registry is checked ahead of every shape
        let err = classify(
            r#"{"username":"u","userNameProviderType":"opaque","password":"p","passwordProviderType":"opaque"}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::MissingRegistry);

        let err = classify(r#"{"registry":"","userNameProviderType":"bogus"}"#).unwrap_err();
        assert_eq!(err, CredentialError::MissingRegistry);
    }

    #[test]
    fn test_unclassifiable() {
        let err = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","password":"p","passwordProviderType":""}"#,
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::UnclassifiableCredential);

        let err = classify(r#"{"registry":"r.io","userNameProviderType":"keychain","passwordProviderType":"keychain"}"#)
            .unwrap_err();
        assert_eq!(err, CredentialError::UnclassifiableCredential);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            classify("not json").unwrap_err(),
            CredentialError::MalformedInput { .. }
        ));
        assert!(matches!(
            classify(r#"{"registry": 42}"#).unwrap_err(),
            CredentialError::MalformedInput { .. }
        ));
    }

    #[test]
    fn test_non_object_input_is_malformed() {
        for raw in [
            r#"["r.io","u","opaque","p","opaque"]"#,
            r#"["r.io"]"#,
            "null",
            r#""r.io""#,
        ] {
            assert!(
                matches!(classify(raw), Err(CredentialError::MalformedInput { .. })),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let cred = classify(
            r#"{"registry":"a.io","registry":"r.io","identity":"i","armResource":"a"}"#,
        )
        .unwrap();
        assert_eq!(cred.registry(), "r.io");
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let err = classify(r#"{"registry":"r.io","identity":null}"#).unwrap_err();
        assert_eq!(err, CredentialError::MissingIdentity);
    }

    #[test]
    fn test_from_str() {
        let cred: RegistryCredential = r#"{"registry":"r.io","identity":"i","armResource":"a"}"#
            .parse()
            .unwrap();
        assert_eq!(cred.kind(), CredentialKind::ManagedIdentity);
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let cred = classify(r#"{"registry":"r.io","identity":"i","armResource":"a"}"#).unwrap();
        let json = serde_json::to_value(&cred).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"registry": "r.io", "identity": "i", "armResource": "a"})
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let cred: RegistryCredential = serde_json::from_str(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","password":"p","passwordProviderType":"opaque"}"#,
        )
        .unwrap();
        assert_eq!(cred.kind(), CredentialKind::Opaque);

        let result: std::result::Result<RegistryCredential, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let cred = classify(
            r#"{"registry":"r.io","username":"u","userNameProviderType":"opaque","password":"hunter2","passwordProviderType":"opaque"}"#,
        )
        .unwrap();
        let debug = format!("{cred:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_equal() {
        let a = classify(r#"{"registry":"r.io","identity":"i","armResource":"a"}"#).unwrap();
        let b = classify(r#"{"registry":"r.io","identity":"i","armResource":"a"}"#).unwrap();
        let c = classify(r#"{"registry":"r.io","identity":"other","armResource":"a"}"#).unwrap();

        assert!(credentials_equal(Some(&a), Some(&a)));
        assert!(credentials_equal(Some(&a), Some(&b)));
        assert!(credentials_equal(Some(&b), Some(&a)));
        assert!(!credentials_equal(Some(&a), Some(&c)));
        assert!(credentials_equal(None, None));
        assert!(!credentials_equal(Some(&a), None));
        assert!(!credentials_equal(None, Some(&a)));
    }
}
