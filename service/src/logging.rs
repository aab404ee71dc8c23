use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Dependency module prefixes muted below TRACE. `tower` also covers `tower_sessions`
/// and `tower_http`; `hyper` covers `hyper_util`.
const FILTERED_MODULES: &[&str] = &["tower", "hyper", "h2", "axum", "reqwest", "rustls"];

/// Crates of this portal, never muted.
#[cfg(test)]
const PORTAL_MODULES: &[&str] = &["aad_auth", "aad_portal", "service", "web"];

pub struct Logger {}

impl Logger {
    /// Install the terminal logger at the configured level.
    ///
    /// Fails if a global logger has already been installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    /// Module prefixes to ignore at `level`; none at TRACE so the whole stack is visible.
    fn muted_modules(level: LevelFilter) -> &'static [&'static str] {
        if level == LevelFilter::Trace {
            &[]
        } else {
            FILTERED_MODULES
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in Self::muted_modules(level) {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }
}
