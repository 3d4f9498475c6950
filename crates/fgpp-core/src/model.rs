//! Data model for discovered principals and password settings.

use serde::{Deserialize, Serialize};

use crate::decode::{Decoded, Interval};
use crate::error::DecodeFailure;

/// Directory attribute names used by discovery.
pub mod attr {
    pub const DISTINGUISHED_NAME: &str = "distinguishedName";
    pub const OBJECT_CLASS: &str = "objectClass";
    pub const OBJECT_CATEGORY: &str = "objectCategory";
    pub const OBJECT_GUID: &str = "objectGUID";
    pub const SAM_ACCOUNT_NAME: &str = "sAMAccountName";
    pub const CN: &str = "cn";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";

    /// Constructed on users: the PSO the directory resolved for them.
    pub const RESULTANT_PSO: &str = "msDS-ResultantPSO";
    /// Back-link on groups: PSOs linked to the group directly.
    pub const PSO_APPLIED: &str = "msDS-PSOApplied";

    pub const PRECEDENCE: &str = "msDS-PasswordSettingsPrecedence";
    pub const MIN_PASSWORD_LENGTH: &str = "msDS-MinimumPasswordLength";
    pub const PASSWORD_HISTORY_LENGTH: &str = "msDS-PasswordHistoryLength";
    pub const LOCKOUT_THRESHOLD: &str = "msDS-LockoutThreshold";
    pub const LOCKOUT_DURATION: &str = "msDS-LockoutDuration";
    pub const LOCKOUT_OBSERVATION_WINDOW: &str = "msDS-LockoutObservationWindow";
    pub const MIN_PASSWORD_AGE: &str = "msDS-MinimumPasswordAge";
    pub const MAX_PASSWORD_AGE: &str = "msDS-MaximumPasswordAge";
    pub const COMPLEXITY_ENABLED: &str = "msDS-PasswordComplexityEnabled";
    pub const REVERSIBLE_ENCRYPTION_ENABLED: &str = "msDS-PasswordReversibleEncryptionEnabled";
    pub const PSO_APPLIES_TO: &str = "msDS-PSOAppliesTo";
}

/// Object class of a PSO definition.
pub const PASSWORD_SETTINGS_CLASS: &str = "msDS-PasswordSettings";

/// RDNs of the PSO container below the default naming context.
pub const PASSWORD_SETTINGS_CONTAINER: &str = "CN=Password Settings Container,CN=System";

/// Whether a principal is a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Group,
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::User => f.write_str("user"),
            PrincipalKind::Group => f.write_str("group"),
        }
    }
}

/// A user or group snapshot taken at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRef {
    /// Distinguished name.
    pub dn: String,
    /// User or group.
    pub kind: PrincipalKind,
    /// Most specific object class (e.g. `user`, `computer`, `group`).
    pub object_class: String,
    /// sAMAccountName, when readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sam_account_name: Option<String>,
    /// Common name, when readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cn: Option<String>,
    /// objectGUID, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_guid: Option<String>,
}

impl PrincipalRef {
    /// Build a principal with only the DN and kind known.
    pub fn new(dn: impl Into<String>, kind: PrincipalKind) -> Self {
        Self {
            dn: dn.into(),
            kind,
            object_class: kind.to_string(),
            sam_account_name: None,
            cn: None,
            object_guid: None,
        }
    }

    /// Display identifier: sAMAccountName, then cn, then the DN's first RDN value.
    pub fn display_name(&self) -> &str {
        self.sam_account_name
            .as_deref()
            .or(self.cn.as_deref())
            .unwrap_or_else(|| rdn_value(&self.dn))
    }

    /// Canonical identity used for de-duplication.
    pub fn identity(&self) -> String {
        normalize_dn(&self.dn)
    }
}

/// A principal together with the PSO reference read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsoReference {
    pub principal: PrincipalRef,
    /// DN of the governing PSO.
    pub pso_dn: String,
    /// Further PSOs linked directly to a group; empty for users.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub competing_pso_dns: Vec<String>,
}

/// Decoded Password Settings Object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordSettings {
    /// Distinguished name (the PSO identifier).
    pub dn: String,
    /// `name` attribute (falls back to `cn`, then the RDN).
    pub name: String,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lower value wins among competing PSOs.
    pub precedence: Decoded<u32>,
    /// Characters.
    pub min_password_length: Decoded<u32>,
    /// Remembered passwords.
    pub password_history_length: Decoded<u32>,
    /// Failed attempts before lockout; 0 disables lockout.
    pub lockout_threshold: Decoded<u32>,
    pub lockout_duration: Decoded<Interval>,
    pub lockout_observation_window: Decoded<Interval>,
    pub min_password_age: Decoded<Interval>,
    pub max_password_age: Decoded<Interval>,
    pub complexity_enabled: Decoded<bool>,
    pub reversible_encryption_enabled: Decoded<bool>,
    /// Direct `msDS-PSOAppliesTo` links as stored on the PSO.
    #[serde(default)]
    pub applies_to: Vec<String>,
}

impl PasswordSettings {
    /// Every attribute that failed to decode.
    pub fn decode_failures(&self) -> Vec<&DecodeFailure> {
        [
            self.precedence.failure(),
            self.min_password_length.failure(),
            self.password_history_length.failure(),
            self.lockout_threshold.failure(),
            self.lockout_duration.failure(),
            self.lockout_observation_window.failure(),
            self.min_password_age.failure(),
            self.max_password_age.failure(),
            self.complexity_enabled.failure(),
            self.reversible_encryption_enabled.failure(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Canonical identity used as the model key.
    pub fn identity(&self) -> String {
        normalize_dn(&self.dn)
    }
}

/// Value of the first RDN of a DN (`CN=Strict,CN=...` -> `Strict`).
///
/// Returns the DN unchanged when it has no `=`.
pub fn rdn_value(dn: &str) -> &str {
    let end = first_unescaped(dn, ',').unwrap_or(dn.len());
    let rdn = &dn[..end];
    match first_unescaped(rdn, '=') {
        Some(eq) => rdn[eq + 1..].trim(),
        None => dn,
    }
}

/// Canonical DN form: lowercased, whitespace around unescaped separators removed.
///
/// Directory DNs compare case-insensitively, and servers are free to echo
/// `CN=A, DC=b` for `cn=a,dc=b`.
pub fn normalize_dn(dn: &str) -> String {
    let mut out = String::with_capacity(dn.len());
    let mut escaped = false;
    let mut pending_spaces = 0usize;
    // only unescaped separators swallow the spaces around them
    let mut after_separator = true;

    for ch in dn.trim().chars() {
        if escaped {
            out.extend(ch.to_lowercase());
            escaped = false;
            continue;
        }
        match ch {
            ',' | '=' | '+' => {
                pending_spaces = 0;
                out.push(ch);
                after_separator = true;
            }
            ' ' => {
                if !after_separator {
                    pending_spaces += 1;
                }
            }
            _ => {
                out.extend(std::iter::repeat(' ').take(pending_spaces));
                pending_spaces = 0;
                if ch == '\\' {
                    out.push(ch);
                    escaped = true;
                } else {
                    out.extend(ch.to_lowercase());
                }
                after_separator = false;
            }
        }
    }
    out
}

fn first_unescaped(s: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == needle {
            return Some(i);
        }
    }
    None
}
