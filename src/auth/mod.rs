//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Local credential login and registration
//! - Google and GitHub OAuth flows
//! - Identity reconciliation (create vs. link vs. conflict vs. claim)
//! - Session token issuance and the AuthedClient extractor

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod reconciler;
pub mod routes;
pub mod service;
pub mod store;
pub mod validators;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use extractors::AuthedClient;
pub use models::Client;
pub use routes::auth_routes;
