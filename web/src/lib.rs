use aad_auth::oauth::{providers::azure_ad, AuthFlow, TokenEndpoint};
use aad_auth::AuthConfig;
use log::*;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;

mod controller;
mod cookies;
pub mod error;
mod router;
mod session;

pub use error::{Error, Result};

/// Shared, immutable state handed to every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flow: AuthFlow,
}

impl AppState {
    pub fn new(config: Config, flow: AuthFlow) -> Self {
        Self {
            config: Arc::new(config),
            flow,
        }
    }

    /// Build the state with the Azure AD token endpoint.
    pub fn with_azure_ad(config: Config, auth_config: AuthConfig) -> Result<Self> {
        let auth_config = Arc::new(auth_config);
        let token_endpoint: Arc<dyn TokenEndpoint> =
            Arc::new(azure_ad::Provider::new(&auth_config)?);
        let flow = AuthFlow::new(auth_config, token_endpoint)?;

        Ok(Self::new(config, flow))
    }
}

/// Turn process configuration into the validated sign-in configuration.
///
/// Missing credentials are passed through as empty values so that validation reports them.
pub fn auth_config(config: &Config) -> core::result::Result<AuthConfig, aad_auth::Error> {
    AuthConfig::builder()
        .tenant_id(config.aad_tenant_id().unwrap_or_default())
        .client_id(config.aad_client_id().unwrap_or_default())
        .client_secret(config.aad_client_secret().unwrap_or_default())
        .authorization_endpoint_template(config.aad_authorization_endpoint_template())
        .logout_endpoint_template(config.aad_logout_endpoint_template())
        .authority(config.aad_authority())
        .default_resource_id(config.aad_graph_api_resource())
        .redirect_uri(config.redirect_endpoint())
        .post_logout_redirect_uri(config.post_logout_redirect_uri())
        .post_auth_default_redirect(config.post_auth_default_redirect())
        .token_exchange_timeout(std::time::Duration::from_secs(
            config.token_exchange_timeout_secs,
        ))
        .build()
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state.config.interface.as_deref().unwrap_or("127.0.0.1");
    let server_url = format!("{host}:{}", app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    info!(
        "Server starting ({} mode)... listening for connections on http://{server_url}",
        app_state.config.runtime_env()
    );

    axum::serve(listener, router::define_routes(app_state)).await
}
