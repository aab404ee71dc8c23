//! Azure AD (v1 endpoints) token endpoint client.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use log::*;
use secrecy::ExposeSecret;
use serde::Deserialize;
use url::Url;

use crate::config::AuthConfig;
use crate::error::{
    exchange_error, ConfigurationErrorKind, Error, ErrorKind, ProviderExchangeErrorKind,
};
use crate::oauth::{TokenEndpoint, TokenRequest, TokenResponse};

/// Successful response body from the Azure AD token endpoint.
#[derive(Debug, Deserialize)]
struct AadTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Error response body from the Azure AD token endpoint.
#[derive(Debug, Deserialize)]
struct AadErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Claims read from the `id_token` payload. The signature is not checked.
#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    upn: Option<String>,
    unique_name: Option<String>,
    email: Option<String>,
    oid: Option<String>,
    sub: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

/// Azure AD sends numeric fields as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().parse().ok(),
        }
    }
}

/// Azure AD token endpoint client.
///
/// Posts the authorization code to `{authority}/{tenant}/oauth2/token` and reads the user's
/// identity from the returned `id_token`.
pub struct Provider {
    token_endpoint: Url,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Azure AD token endpoint client.
    ///
    /// The configured exchange timeout bounds the whole request.
    pub fn new(config: &AuthConfig) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.token_exchange_timeout())
            .build()
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Configuration(ConfigurationErrorKind::HttpClient),
            })?;

        Ok(Self {
            token_endpoint: config.token_endpoint().clone(),
            http_client,
        })
    }
}

#[async_trait]
impl TokenEndpoint for Provider {
    async fn exchange_code(&self, request: TokenRequest) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", request.code.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
            ("resource", request.resource_id.as_str()),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.expose_secret().as_str()),
        ];

        debug!(
            "Exchanging Azure AD authorization code for resource {}",
            request.resource_id
        );

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange Azure AD authorization code: {:?}", e);
                Error::from(e)
            })?;

        if response.status().is_success() {
            let body: AadTokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse Azure AD token response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::ProviderExchange(
                        ProviderExchangeErrorKind::InvalidResponse,
                    ),
                }
            })?;
            let tokens = into_token_response(body, &request.resource_id)?;
            info!("Successfully exchanged Azure AD authorization code for tokens");
            Ok(tokens)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let (code, description) = match serde_json::from_str::<AadErrorResponse>(&error_text)
            {
                Ok(body) => (body.error, body.error_description.unwrap_or_default()),
                Err(_) => (status.as_u16().to_string(), error_text),
            };
            warn!("Azure AD token endpoint returned {status}: {code}");
            Err(exchange_error(
                ProviderExchangeErrorKind::Provider(code),
                &description,
            ))
        }
    }
}

fn into_token_response(
    body: AadTokenResponse,
    requested_resource: &str,
) -> Result<TokenResponse, Error> {
    let expires_on = expiration(&body)?;
    let claims = body
        .id_token
        .as_deref()
        .map(decode_id_token)
        .transpose()?
        .ok_or_else(|| {
            exchange_error(
                ProviderExchangeErrorKind::InvalidResponse,
                "Token response carried no id_token",
            )
        })?;

    let user_id = claims
        .upn
        .or(claims.unique_name)
        .or(claims.email)
        .or(claims.oid)
        .or(claims.sub)
        .ok_or_else(|| {
            exchange_error(
                ProviderExchangeErrorKind::InvalidResponse,
                "id_token carried no user identifier",
            )
        })?;

    Ok(TokenResponse {
        access_token: body.access_token,
        refresh_token: body.refresh_token.unwrap_or_default(),
        expires_on,
        resource_id: body
            .resource
            .unwrap_or_else(|| requested_resource.to_string()),
        user_id,
        given_name: claims.given_name.unwrap_or_default(),
        family_name: claims.family_name.unwrap_or_default(),
    })
}

fn expiration(body: &AadTokenResponse) -> Result<DateTime<Utc>, Error> {
    if let Some(expires_on) = body.expires_on.as_ref().and_then(NumberOrString::as_i64) {
        if let Some(at) = DateTime::<Utc>::from_timestamp(expires_on, 0) {
            return Ok(at);
        }
    }
    if let Some(expires_in) = body.expires_in.as_ref().and_then(NumberOrString::as_i64) {
        return Duration::try_seconds(expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                exchange_error(
                    ProviderExchangeErrorKind::InvalidResponse,
                    "Token response carried an out of range expires_in",
                )
            });
    }
    Err(exchange_error(
        ProviderExchangeErrorKind::InvalidResponse,
        "Token response carried no expiration",
    ))
}

fn decode_id_token(id_token: &str) -> Result<IdTokenClaims, Error> {
    let invalid = |message: &str| exchange_error(ProviderExchangeErrorKind::InvalidResponse, message);

    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| invalid("id_token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| invalid("id_token payload is not base64url"))?;

    serde_json::from_slice(&bytes).map_err(|_| invalid("id_token payload is not JSON"))
}
