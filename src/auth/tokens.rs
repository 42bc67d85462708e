use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use sha2::{Digest, Sha256};

/// Header naming the role whose token is presented
pub const ROLE_HEADER: &str = "x-admin-role";

/// Admin roles, from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Viewer,
    Editor,
    Admin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// Whether the role may modify campaigns
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Editor | Self::Admin)
    }
}

impl Default for AdminRole {
    fn default() -> Self {
        Self::Viewer
    }
}

impl FromStr for AdminRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role bearer tokens
#[derive(Default)]
pub struct AdminTokens(HashMap<AdminRole, Secret<String>>);

impl AdminTokens {
    pub fn new(tokens: HashMap<AdminRole, Secret<String>>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|(_, token)| !token.expose_secret().is_empty())
            .collect();
        Self(tokens)
    }

    /// Check a presented token against the token configured for `role`
    pub fn verify(&self, role: AdminRole, presented: &Secret<String>) -> bool {
        let Some(expected) = self.0.get(&role) else {
            return false;
        };
        // Compare fixed-size digests so timing does not depend on the token prefix
        let expected = Sha256::digest(expected.expose_secret().as_bytes());
        let presented = Sha256::digest(presented.expose_secret().as_bytes());
        expected == presented
    }
}

impl fmt::Debug for AdminTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}
