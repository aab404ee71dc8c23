use crate::error::Result as WebResult;
use crate::session::TowerSession;
use aad_auth::identity::UserIdentity;
use axum::{response::IntoResponse, Json};
use serde::Serialize;
use tower_sessions::Session;
use utoipa::ToSchema;

#[derive(Debug, Default, Serialize, ToSchema)]
pub(crate) struct CurrentUser {
    /// Azure AD user principal name, empty when nobody is signed in.
    id: String,
    name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct HomeView {
    current_user: CurrentUser,
    is_authenticated: bool,
}

/// GET the signed-in user, if any.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Current user and whether the session is authenticated", body = HomeView),
        (status = 500, description = "Session store failure")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(session: Session) -> WebResult<impl IntoResponse> {
    let session = TowerSession::new(session);

    let view = match UserIdentity::load(&session).await? {
        Some(user) => HomeView {
            current_user: CurrentUser {
                name: user.full_name(),
                id: user.user_id,
            },
            is_authenticated: true,
        },
        None => HomeView {
            current_user: CurrentUser::default(),
            is_authenticated: false,
        },
    };

    Ok(Json(view))
}
