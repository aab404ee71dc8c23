//! Flow cookies over the `axum-extra` cookie jar.

use aad_auth::cookies::Cookies;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service::config::Config;
use time::Duration;

/// Request cookies plus the changes to send back, for one request.
pub(crate) struct FlowCookies {
    jar: CookieJar,
    secure: bool,
    max_age: Duration,
}

impl FlowCookies {
    pub(crate) fn new(jar: CookieJar, config: &Config) -> Self {
        Self {
            jar,
            secure: config.is_production(),
            max_age: Duration::seconds(config.flow_cookie_max_age_secs),
        }
    }

    pub(crate) fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl Cookies for FlowCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.jar
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn set(&mut self, name: &'static str, value: String) {
        let cookie = Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(self.max_age)
            .build();
        self.jar = std::mem::take(&mut self.jar).add(cookie);
    }

    fn clear(&mut self, name: &'static str) {
        let cookie = Cookie::build((name, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .build();
        self.jar = std::mem::take(&mut self.jar).add(cookie);
    }
}
