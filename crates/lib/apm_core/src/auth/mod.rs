//! Authenticated session management.
//!
//! Provides bearer token decoding, the reactive session store, the
//! login/refresh/logout flows, and single-flight refresh coordination shared
//! by the request pipeline.

pub mod coordinator;
pub mod jwt;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod store;

use thiserror::Error;

pub use coordinator::{RefreshCoordinator, RefreshState};
pub use scheduler::RefreshScheduler;
pub use service::AuthService;
pub use session::{Role, Session};
pub use store::SessionStore;

/// Token decoding errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),
}
