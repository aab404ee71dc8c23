//! Login, callback and logout for the Azure AD authorization code flow.

use std::sync::Arc;

use log::*;

use crate::config::AuthConfig;
use crate::cookies::{self, Cookies};
use crate::credentials::{Credential, CredentialStore};
use crate::endpoint::EndpointBuilder;
use crate::error::{exchange_error, Error, ProviderExchangeErrorKind};
use crate::identity::UserIdentity;
use crate::oauth::{StateGuard, TokenEndpoint, TokenRequest};
use crate::session::Session;

/// Where a browser is in the login round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Anonymous,
    /// A state token has been issued and the browser sent to Azure AD.
    LoginInitiated,
    /// The callback arrived and the code exchange is in flight.
    CallbackPending,
    Authenticated,
}

/// What the user asked for before being sent to Azure AD.
#[derive(Debug, Clone, Default)]
pub struct LoginIntent {
    /// Resource to request a token for instead of the configured default.
    pub resource_id: Option<String>,
    /// Location inside the application to return to after the callback.
    pub post_auth_redirect: Option<String>,
}

/// Orchestrates the authorization code flow.
///
/// Owns the protocol logic only: cookies and the session are passed in on every call.
#[derive(Clone)]
pub struct AuthFlow {
    config: Arc<AuthConfig>,
    endpoints: EndpointBuilder,
    token_endpoint: Arc<dyn TokenEndpoint>,
}

impl AuthFlow {
    /// Create the flow controller, checking the endpoint templates up front.
    pub fn new(
        config: Arc<AuthConfig>,
        token_endpoint: Arc<dyn TokenEndpoint>,
    ) -> Result<Self, Error> {
        let endpoints = EndpointBuilder::new(Arc::clone(&config));
        endpoints.validate()?;

        Ok(Self {
            config,
            endpoints,
            token_endpoint,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Observable state of a browser given its cookies and session.
    pub async fn current_state<C, S>(cookies: &C, session: &S) -> Result<FlowState, Error>
    where
        C: Cookies,
        S: Session + ?Sized,
    {
        if UserIdentity::is_authenticated(session).await? {
            Ok(FlowState::Authenticated)
        } else if cookies.get(cookies::STATE_TOKEN).is_some() {
            Ok(FlowState::LoginInitiated)
        } else {
            Ok(FlowState::Anonymous)
        }
    }

    /// Start a login: issue CSRF state, remember the intent, return the authorization URL.
    pub fn login<C: Cookies>(&self, cookies: &mut C, intent: LoginIntent) -> Result<String, Error> {
        let state = StateGuard::issue();
        let endpoint = self.endpoints.build_authorization_endpoint(&state)?;

        cookies.set(cookies::STATE_TOKEN, state);

        if let Some(redirect) = intent.post_auth_redirect.filter(|r| !r.is_empty()) {
            if is_local_redirect(&redirect) {
                cookies.set(cookies::POST_AUTH_REDIRECT, redirect);
            } else {
                warn!("Ignoring post-auth redirect outside the application: {redirect}");
            }
        }
        if let Some(resource_id) = intent.resource_id.filter(|r| !r.is_empty()) {
            cookies.set(cookies::REQUESTED_RESOURCE_ID, resource_id);
        }

        debug!("Flow {:?} -> {:?}", FlowState::Anonymous, FlowState::LoginInitiated);
        Ok(endpoint)
    }

    /// Complete a login after Azure AD redirects back with a code.
    ///
    /// Returns the location to send the browser to. The state and intent cookies are cleared
    /// on every outcome; the session is only written after a successful exchange.
    pub async fn callback<C, S>(
        &self,
        code: Option<&str>,
        returned_state: Option<&str>,
        cookies: &mut C,
        session: &S,
    ) -> Result<String, Error>
    where
        C: Cookies,
        S: Session + ?Sized,
    {
        let issued_state = cookies.get(cookies::STATE_TOKEN);
        let requested_resource = cookies.get(cookies::REQUESTED_RESOURCE_ID);
        let post_auth_redirect = cookies.get(cookies::POST_AUTH_REDIRECT);

        let verified = StateGuard::verify(issued_state.as_deref(), returned_state);

        cookies.clear(cookies::STATE_TOKEN);
        if requested_resource.is_some() {
            cookies.clear(cookies::REQUESTED_RESOURCE_ID);
        }
        if post_auth_redirect.is_some() {
            cookies.clear(cookies::POST_AUTH_REDIRECT);
        }

        if let Err(e) = verified {
            warn!("Possible CSRF, rejecting callback: {e}");
            return Err(e);
        }

        let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
            exchange_error(
                ProviderExchangeErrorKind::MissingCode,
                "Callback carried no authorization code",
            )
        })?;

        let resource_id = requested_resource
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.config.default_resource_id().to_string());

        debug!(
            "Flow {:?} -> {:?} for resource {resource_id}",
            FlowState::LoginInitiated,
            FlowState::CallbackPending
        );

        let tokens = self
            .token_endpoint
            .exchange_code(TokenRequest {
                code: code.to_string(),
                redirect_uri: self.config.redirect_uri().to_string(),
                resource_id,
                client_id: self.config.client_id().to_string(),
                client_secret: self.config.client_secret().clone(),
            })
            .await
            .inspect_err(|e| warn!("Failed to exchange authorization code: {e}"))?;

        let user = UserIdentity::new(tokens.user_id, tokens.given_name, tokens.family_name);
        let credential = Credential {
            resource_id: tokens.resource_id,
            access_token: tokens.access_token,
            expiration: tokens.expires_on,
            refresh_token: tokens.refresh_token,
        };
        let resource_id = credential.resource_id.clone();

        let store = CredentialStore::new(session);
        let replaced = store.put(credential).await?;

        if let Err(e) = user.save(session).await {
            warn!("Failed to save user identity, rolling back credential for {resource_id}");
            let rollback = match replaced {
                Some(previous) => store.put(previous).await.map(|_| ()),
                None => store.remove(&resource_id).await.map(|_| ()),
            };
            if let Err(rollback_error) = rollback {
                error!("Failed to roll back credential for {resource_id}: {rollback_error:?}");
            }
            return Err(e);
        }

        info!("User {} authenticated", user.user_id);
        debug!(
            "Flow {:?} -> {:?}",
            FlowState::CallbackPending,
            FlowState::Authenticated
        );

        Ok(post_auth_redirect
            .filter(|r| is_local_redirect(r))
            .unwrap_or_else(|| self.config.post_auth_default_redirect().to_string()))
    }

    /// Log out locally and return the Azure AD logout URL.
    ///
    /// A failure to destroy the session is logged and otherwise ignored; no token is revoked.
    pub async fn logout<C, S>(&self, cookies: &mut C, session: &S) -> Result<String, Error>
    where
        C: Cookies,
        S: Session + ?Sized,
    {
        if let Err(e) = session.destroy().await {
            error!("Failed to destroy session: {e:?}");
        }

        cookies.clear(cookies::STATE_TOKEN);

        debug!("Flow {:?} -> {:?}", FlowState::Authenticated, FlowState::Anonymous);
        self.endpoints.build_logout_endpoint()
    }
}

/// Only paths inside this application may be used after the callback.
///
/// Browsers drop tabs and line breaks while parsing a `Location`, so `/\t/host` would
/// become `//host`: any control or whitespace character disqualifies the location.
fn is_local_redirect(location: &str) -> bool {
    location.starts_with('/')
        && !location.starts_with("//")
        && !location.starts_with("/\\")
        && !location.chars().any(|c| c.is_control() || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_builder;
    use crate::cookies::{MemoryCookies, POST_AUTH_REDIRECT, REQUESTED_RESOURCE_ID, STATE_TOKEN};
    use crate::error::{session_error, CsrfErrorKind, ErrorKind, SessionErrorKind};
    use crate::oauth::mock::StubTokenEndpoint;
    use crate::session::MemorySession;
    use async_trait::async_trait;
    use serde_json::Value;

    fn flow_with(stub: &Arc<StubTokenEndpoint>) -> AuthFlow {
        let config = Arc::new(test_builder().build().unwrap());
        AuthFlow::new(config, Arc::clone(stub) as Arc<dyn TokenEndpoint>).unwrap()
    }

    /// Session whose backend refuses to delete, but whose local data is still dropped.
    struct StubbornSession(MemorySession);

    #[async_trait]
    impl Session for StubbornSession {
        async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
            self.0.set(key, value).await
        }

        async fn destroy(&self) -> Result<(), Error> {
            self.0.destroy().await?;
            Err(session_error(SessionErrorKind::Destroy, "store unavailable"))
        }
    }

    /// Session whose identity writes always fail.
    struct IdentityWriteFails(MemorySession);

    #[async_trait]
    impl Session for IdentityWriteFails {
        async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
            if key == "aad-user" {
                return Err(session_error(SessionErrorKind::Write, "store unavailable"));
            }
            self.0.set(key, value).await
        }

        async fn destroy(&self) -> Result<(), Error> {
            self.0.destroy().await
        }
    }

    #[test]
    fn test_login_sets_state_cookie_and_url() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let mut cookies = MemoryCookies::new();

        let url = flow.login(&mut cookies, LoginIntent::default()).unwrap();

        let state = cookies.set_value(STATE_TOKEN).unwrap().to_string();
        assert!(url.contains(&format!("state={state}")));
        assert_eq!(cookies.set_value(POST_AUTH_REDIRECT), None);
        assert_eq!(cookies.set_value(REQUESTED_RESOURCE_ID), None);
    }

    #[test]
    fn test_login_remembers_intent() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let mut cookies = MemoryCookies::new();

        flow.login(
            &mut cookies,
            LoginIntent {
                resource_id: Some("https://outlook.office.com".to_string()),
                post_auth_redirect: Some("/conversations".to_string()),
            },
        )
        .unwrap();

        assert_eq!(
            cookies.set_value(REQUESTED_RESOURCE_ID),
            Some("https://outlook.office.com")
        );
        assert_eq!(cookies.set_value(POST_AUTH_REDIRECT), Some("/conversations"));
    }

    #[test]
    fn test_login_ignores_external_redirect() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let mut cookies = MemoryCookies::new();

        flow.login(
            &mut cookies,
            LoginIntent {
                resource_id: None,
                post_auth_redirect: Some("https://evil.example.com/".to_string()),
            },
        )
        .unwrap();

        assert_eq!(cookies.set_value(POST_AUTH_REDIRECT), None);
    }

    #[tokio::test]
    async fn test_callback_stores_credential_and_identity() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new()
            .with_request_cookie(STATE_TOKEN, "S")
            .with_request_cookie(REQUESTED_RESOURCE_ID, "R1");

        let location = flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap();

        assert_eq!(location, "/");
        assert_eq!(stub.calls(), 1);

        let request = stub.last_request().unwrap();
        assert_eq!(request.code, "abc123");
        assert_eq!(request.resource_id, "R1");
        assert_eq!(request.client_id, "client-123");
        assert_eq!(request.redirect_uri, "http://localhost:3000/auth");

        let credential = CredentialStore::new(&session).get("R1").await.unwrap().unwrap();
        assert_eq!(credential.resource_id, "R1");
        assert_eq!(credential.access_token, "T1");
        assert_eq!(credential.refresh_token, "RT1");

        assert_eq!(
            UserIdentity::load(&session).await.unwrap(),
            Some(UserIdentity::new("u1", "Ann", "Lee"))
        );
        assert!(cookies.was_cleared(STATE_TOKEN));
        assert!(cookies.was_cleared(REQUESTED_RESOURCE_ID));
        assert_eq!(
            AuthFlow::current_state(&cookies.next_request(), &session)
                .await
                .unwrap(),
            FlowState::Authenticated
        );
    }

    #[tokio::test]
    async fn test_callback_uses_default_resource_and_post_auth_redirect() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new()
            .with_request_cookie(STATE_TOKEN, "S")
            .with_request_cookie(POST_AUTH_REDIRECT, "/conversations");

        let location = flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap();

        assert_eq!(location, "/conversations");
        assert!(cookies.was_cleared(POST_AUTH_REDIRECT));
        assert_eq!(
            stub.last_request().unwrap().resource_id,
            "https://graph.windows.net"
        );
    }

    #[tokio::test]
    async fn test_callback_with_bad_state_never_calls_token_endpoint() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new()
            .with_request_cookie(STATE_TOKEN, "S")
            .with_request_cookie(POST_AUTH_REDIRECT, "/conversations");

        let err = flow
            .callback(Some("x"), Some("BAD"), &mut cookies, &session)
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Csrf(CsrfErrorKind::StateMismatch));
        assert_eq!(stub.calls(), 0);
        assert!(session.is_empty().await);
        assert!(cookies.was_cleared(STATE_TOKEN));
        assert!(cookies.was_cleared(POST_AUTH_REDIRECT));
    }

    #[tokio::test]
    async fn test_callback_without_issued_state_is_rejected() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new();

        let err = flow
            .callback(Some("x"), Some("S"), &mut cookies, &session)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Csrf(CsrfErrorKind::MissingIssuedState)
        );
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_callback_replayed_state_is_rejected() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new().with_request_cookie(STATE_TOKEN, "S");

        flow.callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap();

        let mut replay = cookies.next_request();
        let err = flow
            .callback(Some("abc123"), Some("S"), &mut replay, &session)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Csrf(CsrfErrorKind::MissingIssuedState)
        );
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_callback_exchange_failure_leaves_session_untouched() {
        let stub = Arc::new(StubTokenEndpoint::failing(
            ProviderExchangeErrorKind::Provider("invalid_grant".to_string()),
        ));
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new()
            .with_request_cookie(STATE_TOKEN, "S")
            .with_request_cookie(REQUESTED_RESOURCE_ID, "R1");

        let err = flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::ProviderExchange(ProviderExchangeErrorKind::Provider(
                "invalid_grant".to_string()
            ))
        );
        assert!(session.is_empty().await);
        assert!(cookies.was_cleared(STATE_TOKEN));
        assert!(cookies.was_cleared(REQUESTED_RESOURCE_ID));
    }

    #[tokio::test]
    async fn test_callback_identity_write_failure_keeps_no_credential() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = IdentityWriteFails(MemorySession::new());
        let mut cookies = MemoryCookies::new().with_request_cookie(STATE_TOKEN, "S");

        let err = flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Session(SessionErrorKind::Write));
        assert_eq!(CredentialStore::new(&session).get("R1").await.unwrap(), None);
        assert_eq!(UserIdentity::load(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_callback_identity_write_failure_restores_replaced_credential() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = IdentityWriteFails(MemorySession::new());
        let earlier = Credential {
            resource_id: "R1".to_string(),
            access_token: "T0".to_string(),
            expiration: chrono::Utc::now(),
            refresh_token: "RT0".to_string(),
        };
        CredentialStore::new(&session)
            .put(earlier.clone())
            .await
            .unwrap();
        let mut cookies = MemoryCookies::new().with_request_cookie(STATE_TOKEN, "S");

        assert!(flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .is_err());

        assert_eq!(
            CredentialStore::new(&session).get("R1").await.unwrap(),
            Some(earlier)
        );
    }

    #[tokio::test]
    async fn test_callback_without_code() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new().with_request_cookie(STATE_TOKEN, "S");

        let err = flow
            .callback(None, Some("S"), &mut cookies, &session)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::ProviderExchange(ProviderExchangeErrorKind::MissingCode)
        );
        assert_eq!(stub.calls(), 0);
        assert!(cookies.was_cleared(STATE_TOKEN));
    }

    #[tokio::test]
    async fn test_callback_ignores_external_post_auth_redirect_cookie() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new()
            .with_request_cookie(STATE_TOKEN, "S")
            .with_request_cookie(POST_AUTH_REDIRECT, "//evil.example.com");

        let location = flow
            .callback(Some("abc123"), Some("S"), &mut cookies, &session)
            .await
            .unwrap();

        assert_eq!(location, "/");
    }

    #[tokio::test]
    async fn test_full_round_trip_and_logout() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = MemorySession::new();
        let mut cookies = MemoryCookies::new();

        assert_eq!(
            AuthFlow::current_state(&cookies, &session).await.unwrap(),
            FlowState::Anonymous
        );

        flow.login(&mut cookies, LoginIntent::default()).unwrap();
        let state = cookies.set_value(STATE_TOKEN).unwrap().to_string();

        let mut cookies = cookies.next_request();
        assert_eq!(
            AuthFlow::current_state(&cookies, &session).await.unwrap(),
            FlowState::LoginInitiated
        );

        flow.callback(Some("abc123"), Some(state.as_str()), &mut cookies, &session)
            .await
            .unwrap();
        let mut cookies = cookies.next_request();

        let url = flow.logout(&mut cookies, &session).await.unwrap();

        assert_eq!(
            url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/logout?post_logout_redirect_uri=http://localhost:3000/"
        );
        assert_eq!(CredentialStore::new(&session).get("R1").await.unwrap(), None);
        assert_eq!(
            CredentialStore::new(&session)
                .get("https://graph.windows.net")
                .await
                .unwrap(),
            None
        );
        assert!(cookies.was_cleared(STATE_TOKEN));
        assert_eq!(
            AuthFlow::current_state(&cookies.next_request(), &session)
                .await
                .unwrap(),
            FlowState::Anonymous
        );
    }

    #[tokio::test]
    async fn test_logout_survives_session_destroy_failure() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let session = StubbornSession(MemorySession::new());
        UserIdentity::new("u1", "Ann", "Lee")
            .save(&session)
            .await
            .unwrap();
        let mut cookies = MemoryCookies::new();

        let url = flow.logout(&mut cookies, &session).await.unwrap();

        assert!(url.contains("post_logout_redirect_uri="));
        assert_eq!(UserIdentity::load(&session).await.unwrap(), None);
    }

    #[test]
    fn test_new_rejects_unresolvable_templates() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let config = test_builder()
            .authorization_endpoint_template("https://login/{{tenant}}?state={{state}}")
            .build()
            .unwrap();

        assert!(AuthFlow::new(Arc::new(config), stub).is_err());
    }

    #[test]
    fn test_is_local_redirect() {
        assert!(is_local_redirect("/"));
        assert!(is_local_redirect("/conversations?id=1"));
        assert!(!is_local_redirect("//evil.example.com"));
        assert!(!is_local_redirect("/\\evil.example.com"));
        assert!(!is_local_redirect("https://evil.example.com"));
        assert!(!is_local_redirect("conversations"));
        assert!(!is_local_redirect("/\t/evil.example.com"));
        assert!(!is_local_redirect("/\n/evil.example.com"));
        assert!(!is_local_redirect("/\r/evil.example.com"));
        assert!(!is_local_redirect("/inbox /evil"));
    }

    #[test]
    fn test_login_ignores_redirect_with_embedded_tab() {
        let stub = Arc::new(StubTokenEndpoint::ann_lee());
        let flow = flow_with(&stub);
        let mut cookies = MemoryCookies::new();

        flow.login(
            &mut cookies,
            LoginIntent {
                resource_id: None,
                post_auth_redirect: Some("/\t/evil.example.com".to_string()),
            },
        )
        .unwrap();

        assert_eq!(cookies.set_value(POST_AUTH_REDIRECT), None);
    }
}
