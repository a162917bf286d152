//! # apm_core
//!
//! Client-side session and request pipeline for the AccessPointMap API.
//!
//! The [`client::ApiClient`] composition root owns every piece of shared
//! state (session, server scope, loading indicator, response cache) and hands
//! out typed services built on top of the interceptor [`http::Pipeline`].

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod preferences;
pub mod scope;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
