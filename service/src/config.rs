use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Azure AD v1 authorize endpoint with every placeholder the portal fills in.
pub const DEFAULT_AUTHORIZATION_ENDPOINT_TEMPLATE: &str = "https://login.microsoftonline.com/{{tenantid}}/oauth2/authorize?client_id={{clientid}}&response_type=code&redirect_uri={{redirecturi}}&state={{state}}";

/// Azure AD v1 logout endpoint.
pub const DEFAULT_LOGOUT_ENDPOINT_TEMPLATE: &str = "https://login.microsoftonline.com/{{tenantid}}/oauth2/logout?post_logout_redirect_uri={{postLogoutRedirectUri}}";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The Azure AD tenant to sign users in against (e.g. contoso.onmicrosoft.com)
    #[arg(long, env)]
    aad_tenant_id: Option<String>,

    /// The application (client) ID registered in Azure AD
    #[arg(long, env)]
    aad_client_id: Option<String>,

    /// The client secret registered in Azure AD for this application
    #[arg(long, env, hide_env_values = true)]
    aad_client_secret: Option<String>,

    /// Authorization endpoint template. Supports `{{tenantid}}`, `{{clientid}}`,
    /// `{{redirecturi}}` and `{{state}}`.
    #[arg(long, env, default_value = DEFAULT_AUTHORIZATION_ENDPOINT_TEMPLATE)]
    aad_authorization_endpoint_template: String,

    /// Logout endpoint template. Supports `{{tenantid}}` and `{{postLogoutRedirectUri}}`.
    #[arg(long, env, default_value = DEFAULT_LOGOUT_ENDPOINT_TEMPLATE)]
    aad_logout_endpoint_template: String,

    /// Base URL of the Azure AD authority, the tenant is appended for the token endpoint
    #[arg(long, env, default_value = "https://login.microsoftonline.com/")]
    aad_authority: String,

    /// Resource to request a token for when the login did not name one
    #[arg(long, env, default_value = "https://graph.windows.net")]
    aad_graph_api_resource: String,

    /// The URL Azure AD redirects back to with the authorization code
    #[arg(long, env, default_value = "http://localhost:3000/auth")]
    redirect_endpoint: String,

    /// Where Azure AD sends the browser after signing out
    #[arg(long, env, default_value = "http://localhost:3000/")]
    post_logout_redirect_uri: String,

    /// Where to send the browser after a login that did not ask to return somewhere
    #[arg(long, env, default_value = "/")]
    post_auth_default_redirect: String,

    /// Timeout in seconds for the authorization code exchange with Azure AD
    #[arg(long, env, default_value_t = 30)]
    pub token_exchange_timeout_secs: u64,

    /// Lifetime in seconds of the cookies carried through the login round trip
    #[arg(long, env, default_value_t = 300)]
    pub flow_cookie_max_age_secs: i64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub session_expiry_seconds: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn aad_tenant_id(&self) -> Option<&str> {
        self.aad_tenant_id.as_deref()
    }

    pub fn aad_client_id(&self) -> Option<&str> {
        self.aad_client_id.as_deref()
    }

    pub fn aad_client_secret(&self) -> Option<&str> {
        self.aad_client_secret.as_deref()
    }

    pub fn aad_authorization_endpoint_template(&self) -> &str {
        &self.aad_authorization_endpoint_template
    }

    pub fn aad_logout_endpoint_template(&self) -> &str {
        &self.aad_logout_endpoint_template
    }

    pub fn aad_authority(&self) -> &str {
        &self.aad_authority
    }

    pub fn aad_graph_api_resource(&self) -> &str {
        &self.aad_graph_api_resource
    }

    pub fn redirect_endpoint(&self) -> &str {
        &self.redirect_endpoint
    }

    pub fn post_logout_redirect_uri(&self) -> &str {
        &self.post_logout_redirect_uri
    }

    pub fn post_auth_default_redirect(&self) -> &str {
        &self.post_auth_default_redirect
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_azure_ad() {
        let config = Config::parse_from(["aad_portal"]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.token_exchange_timeout_secs, 30);
        assert_eq!(config.flow_cookie_max_age_secs, 300);
        assert_eq!(config.aad_graph_api_resource(), "https://graph.windows.net");
        assert_eq!(config.post_auth_default_redirect(), "/");
        assert!(config
            .aad_authorization_endpoint_template()
            .contains("{{state}}"));
    }

    #[test]
    fn test_credentials_from_arguments() {
        let config = Config::parse_from([
            "aad_portal",
            "--aad-tenant-id",
            "contoso.onmicrosoft.com",
            "--aad-client-id",
            "client-123",
            "--aad-client-secret",
            "s3cr3t",
            "--runtime-env",
            "production",
        ]);

        assert_eq!(config.aad_tenant_id(), Some("contoso.onmicrosoft.com"));
        assert_eq!(config.aad_client_id(), Some("client-123"));
        assert_eq!(config.aad_client_secret(), Some("s3cr3t"));
        assert!(config.is_production());
    }

    #[test]
    fn test_rust_env_parse() {
        assert_eq!("Staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
