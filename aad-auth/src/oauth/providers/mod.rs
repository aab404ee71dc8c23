//! Token endpoint implementations.

pub mod azure_ad;
