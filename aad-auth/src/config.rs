//! Immutable Azure AD client configuration.
//!
//! Built once at startup and shared read-only by the endpoint builder, the token endpoint
//! client and the flow controller.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{configuration_error, ConfigurationErrorKind, Error};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_GRAPH_API_RESOURCE: &str = "https://graph.windows.net";
pub const DEFAULT_POST_AUTH_REDIRECT: &str = "/";
const DEFAULT_TOKEN_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) const STATE_PLACEHOLDER: &str = "{{state}}";

/// Validated Azure AD configuration.
///
/// Only obtainable through [`AuthConfigBuilder::build`], so every field is known to be present.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    authorization_endpoint_template: String,
    logout_endpoint_template: String,
    redirect_uri: String,
    post_logout_redirect_uri: String,
    token_endpoint: Url,
    default_resource_id: String,
    post_auth_default_redirect: String,
    token_exchange_timeout: Duration,
}

impl AuthConfig {
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn authorization_endpoint_template(&self) -> &str {
        &self.authorization_endpoint_template
    }

    pub fn logout_endpoint_template(&self) -> &str {
        &self.logout_endpoint_template
    }

    /// The application's callback URL registered with Azure AD.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn post_logout_redirect_uri(&self) -> &str {
        &self.post_logout_redirect_uri
    }

    /// `{authority}/{tenant}/oauth2/token`
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Resource requested when the login did not ask for a specific one.
    pub fn default_resource_id(&self) -> &str {
        &self.default_resource_id
    }

    pub fn post_auth_default_redirect(&self) -> &str {
        &self.post_auth_default_redirect
    }

    pub fn token_exchange_timeout(&self) -> Duration {
        self.token_exchange_timeout
    }
}

/// Collects optional settings and validates them into an [`AuthConfig`].
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authorization_endpoint_template: Option<String>,
    logout_endpoint_template: Option<String>,
    redirect_uri: Option<String>,
    post_logout_redirect_uri: Option<String>,
    authority: Option<String>,
    default_resource_id: Option<String>,
    post_auth_default_redirect: Option<String>,
    token_exchange_timeout: Option<Duration>,
}

impl AuthConfigBuilder {
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn authorization_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.authorization_endpoint_template = Some(template.into());
        self
    }

    pub fn logout_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.logout_endpoint_template = Some(template.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uri = Some(uri.into());
        self
    }

    /// Override the Azure AD authority (default: `https://login.microsoftonline.com/`).
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Override the default resource (default: the Azure AD Graph API).
    pub fn default_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.default_resource_id = Some(resource_id.into());
        self
    }

    pub fn post_auth_default_redirect(mut self, location: impl Into<String>) -> Self {
        self.post_auth_default_redirect = Some(location.into());
        self
    }

    pub fn token_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.token_exchange_timeout = Some(timeout);
        self
    }

    /// Validate the collected settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a template or a required parameter is missing or
    /// empty, when the authorization template has no `{{state}}` placeholder, or when the
    /// authority or redirect URI is not an absolute URL.
    pub fn build(self) -> Result<AuthConfig, Error> {
        let authorization_endpoint_template = required_template(
            self.authorization_endpoint_template,
            "aad_authorization_endpoint_template",
        )?;
        let logout_endpoint_template =
            required_template(self.logout_endpoint_template, "aad_logout_endpoint_template")?;

        if !authorization_endpoint_template.contains(STATE_PLACEHOLDER) {
            return Err(configuration_error(
                ConfigurationErrorKind::InvalidTemplate("aad_authorization_endpoint_template"),
                "Authorization endpoint template has no {{state}} placeholder",
            ));
        }

        let tenant_id = required_parameter(self.tenant_id, "aad_tenant_id")?;
        let client_id = required_parameter(self.client_id, "aad_client_id")?;
        let client_secret = required_parameter(self.client_secret, "aad_client_secret")?;
        let redirect_uri = required_parameter(self.redirect_uri, "redirect_endpoint")?;
        let post_logout_redirect_uri =
            required_parameter(self.post_logout_redirect_uri, "post_logout_redirect_uri")?;

        Url::parse(&redirect_uri).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Configuration(
                ConfigurationErrorKind::InvalidUrl("redirect_endpoint"),
            ),
        })?;

        let authority = self
            .authority
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string());
        let token_endpoint = Url::parse(&format!(
            "{}/{}/oauth2/token",
            authority.trim_end_matches('/'),
            tenant_id
        ))
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Configuration(
                ConfigurationErrorKind::InvalidUrl("aad_authority"),
            ),
        })?;

        Ok(AuthConfig {
            tenant_id,
            client_id,
            client_secret: SecretString::new(client_secret),
            authorization_endpoint_template,
            logout_endpoint_template,
            redirect_uri,
            post_logout_redirect_uri,
            token_endpoint,
            default_resource_id: self
                .default_resource_id
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_GRAPH_API_RESOURCE.to_string()),
            post_auth_default_redirect: self
                .post_auth_default_redirect
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_POST_AUTH_REDIRECT.to_string()),
            token_exchange_timeout: self
                .token_exchange_timeout
                .unwrap_or(DEFAULT_TOKEN_EXCHANGE_TIMEOUT),
        })
    }
}

fn required_template(value: Option<String>, name: &'static str) -> Result<String, Error> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        configuration_error(
            ConfigurationErrorKind::MissingTemplate(name),
            &format!("Missing endpoint template: {name}"),
        )
    })
}

fn required_parameter(value: Option<String>, name: &'static str) -> Result<String, Error> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        configuration_error(
            ConfigurationErrorKind::MissingParameter(name),
            &format!("Missing configuration parameter: {name}"),
        )
    })
}

/// Fully populated builder used by tests across the crate.
#[cfg(test)]
pub(crate) fn test_builder() -> AuthConfigBuilder {
    AuthConfig::builder()
        .tenant_id("contoso.onmicrosoft.com")
        .client_id("client-123")
        .client_secret("s3cr3t")
        .authorization_endpoint_template(
            "https://login.microsoftonline.com/{{tenantid}}/oauth2/authorize?client_id={{clientid}}&response_type=code&redirect_uri={{redirecturi}}&state={{state}}",
        )
        .logout_endpoint_template(
            "https://login.microsoftonline.com/{{tenantid}}/oauth2/logout?post_logout_redirect_uri={{postLogoutRedirectUri}}",
        )
        .redirect_uri("http://localhost:3000/auth")
        .post_logout_redirect_uri("http://localhost:3000/")
}
