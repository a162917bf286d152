//! Proactive refresh shortly before the bearer token expires.
//!
//! Optional: the 401 path in [`crate::http::RefreshInterceptor`] covers
//! expiry on its own. The worker follows the session store, so a new
//! session re-arms the timer and a logout disarms it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::coordinator::RefreshCoordinator;

/// Lower bound between two timer-driven refreshes.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Time to wait before refreshing a token that expires at `expires_at`.
pub fn refresh_delay(expires_at: DateTime<Utc>, margin: Duration, now: DateTime<Utc>) -> Duration {
    let remaining = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining.saturating_sub(margin).max(MIN_REFRESH_INTERVAL)
}

/// Handle to the background refresh worker. Dropping it stops the worker.
pub struct RefreshScheduler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn(coordinator: Arc<RefreshCoordinator>, margin: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(coordinator, margin, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(coordinator: Arc<RefreshCoordinator>, margin: Duration, cancel: CancellationToken) {
    let mut sessions = coordinator.auth().sessions().subscribe();
    debug!(margin_secs = margin.as_secs(), "refresh scheduler started");

    loop {
        let delay = sessions
            .borrow_and_update()
            .as_ref()
            .and_then(|session| session.expires_at)
            .map(|expires_at| refresh_delay(expires_at, margin, Utc::now()));

        let Some(delay) = delay else {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = sessions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        };

        debug!(delay_secs = delay.as_secs(), "refresh timer armed");
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "scheduled token refresh failed");
                }
            }
        }
    }

    debug!("refresh scheduler stopped");
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::auth::{AuthService, SessionStore};
    use crate::http::Pipeline;
    use crate::models::auth::LoginRequest;
    use crate::scope::ServerScope;
    use crate::storage::LocalStorage;
    use crate::testing::{SERVER, StubBackend};

    #[test]
    fn delay_subtracts_margin_from_remaining_lifetime() {
        let now = Utc::now();
        let expires_at = now + TimeDelta::seconds(600);
        assert_eq!(
            refresh_delay(expires_at, Duration::from_secs(60), now),
            Duration::from_secs(540)
        );
    }

    #[test]
    fn expired_or_nearly_expired_tokens_refresh_soon() {
        let now = Utc::now();
        let margin = Duration::from_secs(60);
        assert_eq!(
            refresh_delay(now - TimeDelta::seconds(5), margin, now),
            MIN_REFRESH_INTERVAL
        );
        assert_eq!(
            refresh_delay(now + TimeDelta::seconds(30), margin, now),
            MIN_REFRESH_INTERVAL
        );
    }

    async fn coordinator(backend: Arc<StubBackend>) -> Arc<RefreshCoordinator> {
        let auth = AuthService::new(
            ServerScope::default(),
            SessionStore::new(),
            LocalStorage::in_memory(),
            Pipeline::new(backend),
        );
        auth.login(
            SERVER,
            &LoginRequest {
                email: "a@b.com".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap();
        Arc::new(RefreshCoordinator::new(Arc::new(auth)))
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_before_expiry() {
        let backend = Arc::new(StubBackend::new());
        let coordinator = coordinator(backend.clone()).await;
        let sessions = coordinator.auth().sessions().clone();

        let mut expiring = (*sessions.current().unwrap()).clone();
        expiring.expires_at = Some(Utc::now() + TimeDelta::seconds(120));
        let stale_token = expiring.token.clone();
        sessions.replace(expiring);

        let mut rx = sessions.subscribe();
        let scheduler = RefreshScheduler::spawn(coordinator.clone(), Duration::from_secs(60));
        rx.changed().await.unwrap();

        assert_eq!(backend.refreshes(), 1);
        assert_ne!(sessions.current().unwrap().token, stale_token);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn logout_disarms_and_shutdown_stops_worker() {
        let backend = Arc::new(StubBackend::new());
        let coordinator = coordinator(backend.clone()).await;

        let scheduler = RefreshScheduler::spawn(coordinator.clone(), Duration::from_secs(60));
        coordinator.auth().client_side_logout();
        tokio::task::yield_now().await;
        assert!(scheduler.is_running());
        assert_eq!(backend.refreshes(), 0);

        scheduler.shutdown().await;
    }
}
