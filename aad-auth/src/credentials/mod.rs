//! Per-resource credentials kept in the user's session.

mod store;

pub use store::{Credential, CredentialStore};
