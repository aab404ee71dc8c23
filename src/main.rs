use log::*;
use service::{config::Config, logging::Logger};
use web::AppState;

#[tokio::main]
async fn main() {
    let config = get_config();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logging: {e}");
        std::process::exit(1);
    }

    info!("Starting up the Azure AD portal...");

    let auth_config = match web::auth_config(&config) {
        Ok(auth_config) => auth_config,
        Err(e) => {
            error!("Invalid Azure AD configuration, refusing to start: {e} ({e:?})");
            std::process::exit(1);
        }
    };

    info!(
        "Signing users in against tenant {} (client {})",
        auth_config.tenant_id(),
        auth_config.client_id()
    );

    let app_state = match AppState::with_azure_ad(config, auth_config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to set up the sign-in flow: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

fn get_config() -> Config {
    Config::new()
}
