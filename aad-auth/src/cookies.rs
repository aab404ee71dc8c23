//! Names and access for the single-use cookies carried through the login round trip.

use std::collections::HashMap;

/// CSRF state issued at login.
pub const STATE_TOKEN: &str = "stateToken";
/// Location to return to after a successful callback.
pub const POST_AUTH_REDIRECT: &str = "postAuthRedirect";
/// Resource to request a token for instead of the configured default.
pub const REQUESTED_RESOURCE_ID: &str = "requestedResourceId";

/// Request cookies in, response cookie changes out.
///
/// `get` reflects the request; `set` and `clear` record changes to send with the response.
pub trait Cookies {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&mut self, name: &'static str, value: String);

    fn clear(&mut self, name: &'static str);
}

/// Cookie jar kept in memory, records what a response would send.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookies {
    request: HashMap<String, String>,
    set: HashMap<&'static str, String>,
    cleared: Vec<&'static str>,
}

impl MemoryCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from cookies the browser sent with the request.
    pub fn with_request_cookie(mut self, name: &str, value: &str) -> Self {
        self.request.insert(name.to_string(), value.to_string());
        self
    }

    /// Value set on the response, if any.
    pub fn set_value(&self, name: &str) -> Option<&str> {
        self.set.get(name).map(String::as_str)
    }

    pub fn was_cleared(&self, name: &str) -> bool {
        self.cleared.contains(&name)
    }

    /// Carry the response changes over as the next request's cookies, the way a browser would.
    pub fn next_request(&self) -> Self {
        let mut request = self.request.clone();
        for name in &self.cleared {
            request.remove(*name);
        }
        for (name, value) in &self.set {
            request.insert((*name).to_string(), value.clone());
        }
        Self {
            request,
            ..Self::default()
        }
    }
}

impl Cookies for MemoryCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.request.get(name).cloned()
    }

    fn set(&mut self, name: &'static str, value: String) {
        self.cleared.retain(|n| *n != name);
        self.set.insert(name, value);
    }

    fn clear(&mut self, name: &'static str) {
        self.set.remove(name);
        if !self.cleared.contains(&name) {
            self.cleared.push(name);
        }
    }
}
