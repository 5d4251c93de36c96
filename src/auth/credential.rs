use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// An access key pair issued by the remote service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credential {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Parse a pasted access token of the form `<access-key-id>:<secret-access-key>`.
    ///
    /// The token is split at the first `:`, so the secret may itself contain colons.
    /// A token without a separator becomes a key id with an empty secret; the
    /// registry rejects it when it is first used.
    pub fn from_token(token: &str) -> Result<Self> {
        let token = token.trim();

        if token.chars().any(char::is_control) {
            return Err(Error::MalformedToken(
                "token contains control characters".to_string(),
            ));
        }

        let (id, secret) = token.split_once(':').unwrap_or((token, ""));
        if id.is_empty() {
            return Err(Error::MalformedToken("access key id is empty".to_string()));
        }

        Ok(Self::new(id, secret))
    }

    /// Serialize for the secret store.
    pub fn to_secret(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::CredentialFormat)
    }

    /// Deserialize a secret store entry.
    pub fn from_secret(secret: &str) -> Result<Self> {
        serde_json::from_str(secret).map_err(Error::CredentialFormat)
    }
}

// The secret never reaches logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}
