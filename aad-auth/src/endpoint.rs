//! Azure AD authorization and logout endpoint construction.

use std::sync::Arc;

use crate::config::{AuthConfig, STATE_PLACEHOLDER};
use crate::error::{configuration_error, ConfigurationErrorKind, Error};

const TENANT_ID_PLACEHOLDER: &str = "{{tenantid}}";
const CLIENT_ID_PLACEHOLDER: &str = "{{clientid}}";
const REDIRECT_URI_PLACEHOLDER: &str = "{{redirecturi}}";
const POST_LOGOUT_REDIRECT_URI_PLACEHOLDER: &str = "{{postLogoutRedirectUri}}";

/// Builds browser redirect URLs from the configured endpoint templates.
///
/// Substitution is literal: values are inserted as-is and must already be safe to
/// place in a URL.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    config: Arc<AuthConfig>,
}

impl EndpointBuilder {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }

    /// Check that both templates resolve completely, so bad templates fail at startup
    /// instead of on the first login.
    pub fn validate(&self) -> Result<(), Error> {
        self.build_authorization_endpoint("startup-check")?;
        self.build_logout_endpoint()?;
        Ok(())
    }

    /// Get the authorization code endpoint for a login attempt.
    ///
    /// # Arguments
    ///
    /// * `state` - CSRF state issued for this login attempt
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `state` is empty or a placeholder is left unresolved.
    pub fn build_authorization_endpoint(&self, state: &str) -> Result<String, Error> {
        if state.is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::MissingParameter("state"),
                "Cannot build authorization endpoint without a state value",
            ));
        }

        let endpoint = fill(
            self.config.authorization_endpoint_template(),
            &[
                (TENANT_ID_PLACEHOLDER, self.config.tenant_id()),
                (CLIENT_ID_PLACEHOLDER, self.config.client_id()),
                (REDIRECT_URI_PLACEHOLDER, self.config.redirect_uri()),
                (STATE_PLACEHOLDER, state),
            ],
        );

        ensure_resolved(endpoint)
    }

    /// Get the Azure AD logout endpoint.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a placeholder is left unresolved.
    pub fn build_logout_endpoint(&self) -> Result<String, Error> {
        let endpoint = fill(
            self.config.logout_endpoint_template(),
            &[
                (TENANT_ID_PLACEHOLDER, self.config.tenant_id()),
                (
                    POST_LOGOUT_REDIRECT_URI_PLACEHOLDER,
                    self.config.post_logout_redirect_uri(),
                ),
            ],
        );

        ensure_resolved(endpoint)
    }
}

fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    substitutions
        .iter()
        .fold(template.to_string(), |endpoint, (placeholder, value)| {
            endpoint.replace(placeholder, value)
        })
}

fn ensure_resolved(endpoint: String) -> Result<String, Error> {
    match endpoint.find("{{") {
        Some(start) => {
            let placeholder = endpoint[start..]
                .find("}}")
                .map(|end| endpoint[start..start + end + 2].to_string())
                .unwrap_or_else(|| endpoint[start..].to_string());
            Err(configuration_error(
                ConfigurationErrorKind::UnresolvedPlaceholder(placeholder.clone()),
                &format!("Endpoint template has unknown placeholder {placeholder}"),
            ))
        }
        None => Ok(endpoint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_builder;
    use crate::error::ErrorKind;

    fn builder() -> EndpointBuilder {
        EndpointBuilder::new(Arc::new(test_builder().build().unwrap()))
    }

    #[test]
    fn test_authorization_endpoint_substitutes_all_parameters() {
        let url = builder().build_authorization_endpoint("abc123").unwrap();

        assert_eq!(
            url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/authorize?client_id=client-123&response_type=code&redirect_uri=http://localhost:3000/auth&state=abc123"
        );
    }

    #[test]
    fn test_authorization_endpoint_contains_state_exactly_once() {
        let state = "f00dfeed";
        let url = builder().build_authorization_endpoint(state).unwrap();

        assert_eq!(url.matches(state).count(), 1);
        assert!(!url.contains("{{"));
        assert!(!url.contains("}}"));
    }

    #[test]
    fn test_authorization_endpoint_rejects_empty_state() {
        let err = builder().build_authorization_endpoint("").unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Configuration(ConfigurationErrorKind::MissingParameter("state"))
        );
    }

    #[test]
    fn test_unknown_placeholder_is_reported() {
        let config = test_builder()
            .authorization_endpoint_template(
                "https://login/{{tenantid}}/authorize?state={{state}}&resource={{resource}}",
            )
            .build()
            .unwrap();
        let err = EndpointBuilder::new(Arc::new(config))
            .build_authorization_endpoint("s")
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Configuration(ConfigurationErrorKind::UnresolvedPlaceholder(
                "{{resource}}".to_string()
            ))
        );
    }

    #[test]
    fn test_validate_catches_bad_logout_template() {
        let config = test_builder()
            .logout_endpoint_template("https://login/{{tenantid}}/logout?next={{next}}")
            .build()
            .unwrap();

        assert!(builder().validate().is_ok());
        assert!(EndpointBuilder::new(Arc::new(config)).validate().is_err());
    }

    #[test]
    fn test_logout_endpoint() {
        let url = builder().build_logout_endpoint().unwrap();

        assert_eq!(
            url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/logout?post_logout_redirect_uri=http://localhost:3000/"
        );
    }
}
