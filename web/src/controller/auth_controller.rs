//! Controller for the Azure AD sign-in round trip.
//!
//! All three endpoints are reached by browser redirects, so every outcome is a redirect or a
//! bare status code, and every response carries the flow cookie changes.

use crate::cookies::FlowCookies;
use crate::session::TowerSession;
use crate::{AppState, Error};

use aad_auth::oauth::LoginIntent;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use log::*;
use serde::Deserialize;
use tower_sessions::Session;
use utoipa::IntoParams;

/// Query parameters for starting a login
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoginParams {
    /// Resource to request an access token for, defaults to the Graph API.
    pub resource_id: Option<String>,
    /// Local path to return to after signing in.
    pub redir: Option<String>,
}

/// Query parameters Azure AD sends to the redirect endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user or tenant refused the request.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /login
///
/// Starts the authorization code flow by redirecting to the Azure AD authorize endpoint.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginParams),
    responses(
        (status = 303, description = "Redirect to the Azure AD authorize endpoint"),
        (status = 500, description = "Sign-in is misconfigured"),
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Response {
    let mut cookies = FlowCookies::new(jar, &app_state.config);

    let result = app_state.flow.login(
        &mut cookies,
        LoginIntent {
            resource_id: params.resource_id,
            post_auth_redirect: params.redir,
        },
    );

    redirect_with(cookies, result)
}

/// GET /auth
///
/// Redirect endpoint registered with Azure AD. Checks the returned state, exchanges the code
/// and signs the user in.
#[utoipa::path(
    get,
    path = "/auth",
    params(CallbackParams),
    responses(
        (status = 303, description = "Signed in, redirect back into the portal"),
        (status = 400, description = "State mismatch or no authorization code"),
        (status = 401, description = "Azure AD refused the authorization code"),
        (status = 502, description = "Azure AD token endpoint unreachable"),
        (status = 500, description = "Session store failure"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = &params.error {
        warn!(
            "Azure AD returned {error} to the redirect endpoint: {}",
            params.error_description.as_deref().unwrap_or_default()
        );
    }

    let mut cookies = FlowCookies::new(jar, &app_state.config);
    let session = TowerSession::new(session);

    let result = app_state
        .flow
        .callback(
            params.code.as_deref(),
            params.state.as_deref(),
            &mut cookies,
            &session,
        )
        .await;

    if result.is_ok() {
        if let Err(e) = session.cycle_id().await {
            warn!("Failed to issue a new session id after sign-in: {e}");
        }
    }

    redirect_with(cookies, result)
}

/// GET /logout
///
/// Ends the local session and redirects to the Azure AD logout endpoint.
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Redirect to the Azure AD logout endpoint"),
        (status = 500, description = "Sign-in is misconfigured"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: CookieJar,
    session: Session,
) -> Response {
    let mut cookies = FlowCookies::new(jar, &app_state.config);
    let session = TowerSession::new(session);

    let result = app_state.flow.logout(&mut cookies, &session).await;

    redirect_with(cookies, result)
}

fn redirect_with(cookies: FlowCookies, result: Result<String, aad_auth::Error>) -> Response {
    match result {
        Ok(location) => (cookies.into_jar(), Redirect::to(&location)).into_response(),
        Err(e) => (cookies.into_jar(), Error::from(e)).into_response(),
    }
}
