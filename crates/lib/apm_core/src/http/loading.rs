//! In-flight request tracking for a global loading indicator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use super::interceptor::{Interceptor, Next};
use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::error::{ClientError, ClientResult};

struct LoadingState {
    /// Request identifier → number of identical requests in flight.
    in_flight: Mutex<HashMap<String, usize>>,
    is_loading: watch::Sender<bool>,
}

/// Set of in-flight request identifiers; loading iff non-empty.
#[derive(Clone)]
pub struct LoadingIndicator {
    state: Arc<LoadingState>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(LoadingState {
                in_flight: Mutex::new(HashMap::new()),
                is_loading: tx,
            }),
        }
    }

    /// Mark `id` as started (`true`) or finished (`false`).
    pub fn set_loading(&self, id: &str, loading: bool) -> ClientResult<()> {
        if id.is_empty() {
            return Err(ClientError::Validation(
                "Invalid loading url identifier.".into(),
            ));
        }

        let mut in_flight = self
            .state
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if loading {
            *in_flight.entry(id.to_string()).or_default() += 1;
        } else if let Some(count) = in_flight.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(id);
            }
        }
        let now_loading = !in_flight.is_empty();
        self.state
            .is_loading
            .send_if_modified(|current| std::mem::replace(current, now_loading) != now_loading);
        Ok(())
    }

    /// Track `id` until the returned guard drops.
    pub fn start(&self, id: &str) -> LoadingGuard {
        let tracked = self.set_loading(id, true).is_ok();
        LoadingGuard {
            indicator: self.clone(),
            id: id.to_string(),
            tracked,
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.state.is_loading.borrow()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.is_loading.subscribe()
    }
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Finishes its request on drop, including when the request future is
/// cancelled.
pub struct LoadingGuard {
    indicator: LoadingIndicator,
    id: String,
    tracked: bool,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.tracked {
            let _ = self.indicator.set_loading(&self.id, false);
        }
    }
}

/// Registers every request with the [`LoadingIndicator`] for its lifetime.
pub struct LoadingInterceptor {
    indicator: LoadingIndicator,
}

impl LoadingInterceptor {
    pub fn new(indicator: LoadingIndicator) -> Self {
        Self { indicator }
    }
}

#[async_trait]
impl Interceptor for LoadingInterceptor {
    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> ClientResult<ApiResponse> {
        let _guard = self.indicator.start(request.url_with_params());
        next.run(request).await
    }

    fn name(&self) -> &str {
        "loading"
    }
}
