use crate::controller::{auth_controller, health_check_controller, home_controller};
use crate::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use log::*;
use service::config::Config;
use time::Duration;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Azure AD Portal API"
        ),
        paths(
            auth_controller::login,
            auth_controller::callback,
            auth_controller::logout,
            home_controller::index,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                home_controller::HomeView,
                home_controller::CurrentUser,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "aad_portal", description = "Azure Active Directory sign-in")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value set by a successful sign-in via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let session_layer = session_layer(&app_state.config);
    let cors_layer = cors_layer(&app_state.config);

    Router::new()
        .merge(auth_routes(app_state.clone()))
        .merge(home_routes())
        .merge(health_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(session_layer)
        .layer(cors_layer)
}

fn auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login", get(auth_controller::login))
        .route("/auth", get(auth_controller::callback))
        .route("/logout", get(auth_controller::logout))
        .with_state(app_state)
}

fn home_routes() -> Router {
    Router::new().route("/", get(home_controller::index))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.is_production())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.session_expiry_seconds,
        )))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
