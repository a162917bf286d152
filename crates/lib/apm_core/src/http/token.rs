//! Bearer token injection.

use async_trait::async_trait;

use super::interceptor::{Interceptor, Next};
use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::auth::SessionStore;
use crate::error::ClientResult;
use crate::scope::ServerScope;

/// Attaches the session's bearer token to requests aimed at the configured
/// backend. Requests to any other host leave untouched.
pub struct TokenInterceptor {
    sessions: SessionStore,
    scope: ServerScope,
}

impl TokenInterceptor {
    pub fn new(sessions: SessionStore, scope: ServerScope) -> Self {
        Self { sessions, scope }
    }
}

#[async_trait]
impl Interceptor for TokenInterceptor {
    async fn intercept(&self, mut request: ApiRequest, next: Next<'_>) -> ClientResult<ApiResponse> {
        if let Some(session) = self.sessions.current()
            && self.scope.is_backend_url(&request.url)
        {
            request.set_bearer(&session.token)?;
        }
        next.run(request).await
    }

    fn name(&self) -> &str {
        "token"
    }
}
