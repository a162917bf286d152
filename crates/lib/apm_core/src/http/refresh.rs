//! 401 recovery.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::interceptor::{Interceptor, Next};
use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::auth::RefreshCoordinator;
use crate::error::ClientResult;
use crate::scope::ServerScope;

/// Refreshes the session once when a backend request comes back `401` and
/// resubmits the original request.
///
/// Concurrent failures share one refresh through the [`RefreshCoordinator`].
/// The resubmitted request is not refreshed again: a second `401` surfaces as
/// is. A `401` from any other host is returned untouched. The new token is
/// attached by the inner token stage, never here.
pub struct RefreshInterceptor {
    coordinator: Arc<RefreshCoordinator>,
    scope: ServerScope,
}

impl RefreshInterceptor {
    pub fn new(coordinator: Arc<RefreshCoordinator>, scope: ServerScope) -> Self {
        Self { coordinator, scope }
    }
}

#[async_trait]
impl Interceptor for RefreshInterceptor {
    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> ClientResult<ApiResponse> {
        let retry = request.clone();
        match next.run(request).await {
            Err(e) if e.is_unauthorized() && self.scope.is_backend_url(&retry.url) => {
                debug!(url = %retry.url, "request unauthorized, refreshing session");
                self.coordinator.refresh().await?;
                next.run(retry).await.inspect_err(|e| {
                    if e.is_unauthorized() {
                        warn!("request still unauthorized after refresh");
                    }
                })
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "refresh"
    }
}
