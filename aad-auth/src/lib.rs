//! # aad-auth
//!
//! Azure Active Directory sign-in for the portal:
//! - Endpoint construction from configurable authorization and logout templates
//! - CSRF state issuance and validation for the authorization code flow
//! - Code exchange against the Azure AD token endpoint
//! - Per-resource credentials and the signed-in user's identity, kept in the session
//!
//! ## Architecture
//!
//! The crate knows nothing about HTTP frameworks. The web layer adapts its cookie jar and
//! session to the [`cookies::Cookies`] and [`session::Session`] traits and hands them to
//! [`oauth::AuthFlow`] on each request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aad_auth::{
//!     config::AuthConfig,
//!     oauth::{providers::azure_ad, AuthFlow, LoginIntent},
//! };
//! ```

pub mod config;
pub mod cookies;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod oauth;
pub mod session;

// Re-export commonly used types
pub use config::AuthConfig;
pub use credentials::{Credential, CredentialStore};
pub use endpoint::EndpointBuilder;
pub use error::{Error, ErrorKind};
pub use identity::UserIdentity;
