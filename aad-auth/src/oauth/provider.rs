//! Token endpoint trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::Error;

/// Parameters for exchanging an authorization code at the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Authorization code from the OAuth callback.
    pub code: String,
    /// Redirect URI used for the authorization request.
    pub redirect_uri: String,
    /// Resource the access token should grant access to.
    pub resource_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Result of a successful code exchange: tokens plus the identity they were issued to.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_on: DateTime<Utc>,
    /// Resource the token was issued for, as reported by the provider.
    pub resource_id: String,
    pub user_id: String,
    pub given_name: String,
    pub family_name: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_on", &self.expires_on)
            .field("resource_id", &self.resource_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// The provider's token endpoint, called server-to-server during the callback.
///
/// Calls are never retried; any failure is reported as a provider exchange error and the
/// user has to start a new login.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for tokens.
    ///
    /// # Arguments
    ///
    /// * `request` - Code, redirect URI, resource and client credentials
    ///
    /// # Returns
    ///
    /// Access and refresh tokens, their expiry and the user's identity.
    async fn exchange_code(&self, request: TokenRequest) -> Result<TokenResponse, Error>;
}
