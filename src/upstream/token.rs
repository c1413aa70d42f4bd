//! API token credentials.

use std::fmt;

/// A Proxmox API token: `user@realm!tokenname` plus its secret UUID.
#[derive(Clone, Default)]
pub struct ApiToken {
    id: String,
    secret: String,
}

impl ApiToken {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// The token id (`user@realm!name`).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value of the `Authorization` header the API expects.
    pub fn header_value(&self) -> String {
        format!("PVEAPIToken={}={}", self.id, self.secret)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
