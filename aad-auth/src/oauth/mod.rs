//! OAuth 2.0 authorization code flow against Azure AD.
//!
//! Provides CSRF state handling, the token endpoint seam and the login/callback/logout
//! controller.

mod flow;
mod provider;
mod state;

pub mod providers;

pub use flow::{AuthFlow, FlowState, LoginIntent};
pub use provider::{TokenEndpoint, TokenRequest, TokenResponse};
pub use state::StateGuard;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
