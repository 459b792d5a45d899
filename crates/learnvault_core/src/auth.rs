//! Single-use exchange of an authorization code for a repository credential.

use crate::error::{Result, VaultError};
use serde::Deserialize;
use std::fmt;
use tracing::info;

/// Opaque credential authorizing repository calls. Redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token, for the `Authorization` header and the config file.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consumes the credential.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

fn parse_token_response(body: &str) -> Result<Credential> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| VaultError::parse("token response", e))?;
    match response.token {
        Some(token) if !token.trim().is_empty() => Ok(Credential(token)),
        _ => Err(VaultError::Transport {
            operation: "login".to_string(),
            status: None,
            message: "the token endpoint returned no credential".to_string(),
        }),
    }
}

/// Exchanges `code` at `token_url` for a credential.
///
/// Codes are single-use; call this exactly once per login and pass the
/// result down.
pub async fn exchange_code(http: &reqwest::Client, token_url: &str, code: &str) -> Result<Credential> {
    let response = http
        .get(token_url)
        .query(&[("code", code)])
        .send()
        .await
        .map_err(|e| VaultError::transport("login", e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(VaultError::Transport {
            operation: "login".to_string(),
            status: Some(status.as_u16()),
            message: format!("HTTP {}", status),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| VaultError::transport("login", e.to_string()))?;
    let credential = parse_token_response(&body)?;
    info!("Authorization code exchanged");
    Ok(credential)
}
