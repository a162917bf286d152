//! Single-flight token refresh.
//!
//! The first caller starts a refresh and parks a shared handle to it in the
//! coordinator. Callers arriving while it is outstanding await the same
//! handle, so one outstanding refresh means exactly one `/auth/refresh` call.
//! The refresh future empties the slot itself when it completes.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use super::service::AuthService;
use super::session::Session;
use crate::error::{ClientError, ClientResult};

type SharedRefresh = Shared<BoxFuture<'static, ClientResult<Arc<Session>>>>;

/// Whether a refresh is currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    RefreshInProgress,
}

pub struct RefreshCoordinator {
    auth: Arc<AuthService>,
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn state(&self) -> RefreshState {
        let slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            RefreshState::RefreshInProgress
        } else {
            RefreshState::Idle
        }
    }

    /// Refresh the session, joining the outstanding refresh if there is one.
    ///
    /// Errors are mapped for request callers: a `401`/`403` from the refresh
    /// endpoint clears local state and becomes
    /// [`ClientError::AuthenticationRequired`]; anything else becomes
    /// [`ClientError::RefreshFailed`].
    pub async fn refresh(&self) -> ClientResult<Arc<Session>> {
        let shared = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(outstanding) => {
                    debug!("joining outstanding token refresh");
                    outstanding.clone()
                }
                None => {
                    let refresh = self.start().shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };
        shared.await
    }

    fn start(&self) -> BoxFuture<'static, ClientResult<Arc<Session>>> {
        let auth = Arc::clone(&self.auth);
        let slot = Arc::clone(&self.in_flight);
        async move {
            let result = auth.refresh().await.map_err(|e| {
                if e.is_session_invalidating() {
                    auth.client_side_logout();
                    ClientError::AuthenticationRequired
                } else {
                    ClientError::RefreshFailed(e.to_string())
                }
            });
            slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            result
        }
        .boxed()
    }
}
