//! Remote-platform credential tags.
//!
//! Token acquisition happens before an adapter is built; the method tag is
//! carried for logging and configuration only.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    DeveloperToken,
    Jwt,
    #[serde(rename = "oauth2_ccg")]
    OAuth2ClientCredentials,
    #[serde(rename = "oauth2_ac")]
    OAuth2AuthorizationCode,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeveloperToken => "developer_token",
            Self::Jwt => "jwt",
            Self::OAuth2ClientCredentials => "oauth2_ccg",
            Self::OAuth2AuthorizationCode => "oauth2_ac",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-resolved bearer token and the method that produced it.
#[derive(Clone)]
pub struct Credentials {
    pub method: AuthMethod,
    access_token: String,
}

impl Credentials {
    pub fn new(method: AuthMethod, access_token: impl Into<String>) -> Self {
        Self {
            method,
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("method", &self.method)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
