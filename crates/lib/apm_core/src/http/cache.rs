//! Opt-in in-memory cache for GET responses.
//!
//! A GET request carrying [`ALLOW_LOCAL_CACHE_HEADER`] is answered from the
//! cache when possible and stored on success otherwise. A GET request
//! without the header always reaches the network, and when a response for
//! the same URL was cached earlier the fresh response overwrites it. That is
//! how callers bypass stale data after a mutation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use http::Method;
use http::header::{HeaderName, HeaderValue};
use tracing::debug;

use super::interceptor::{Interceptor, Next};
use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::error::ClientResult;

/// Header opting a GET request into the local cache. Stripped before the
/// request leaves the client.
pub const ALLOW_LOCAL_CACHE_HEADER: HeaderName = HeaderName::from_static("x-allow-local-cache");

/// Value sent with [`ALLOW_LOCAL_CACHE_HEADER`].
pub const ALLOW_LOCAL_CACHE_VALUE: HeaderValue = HeaderValue::from_static("true");

/// Responses keyed by full request URL. Unbounded; lives as long as the
/// owning client.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, ApiResponse>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<ApiResponse> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: String, response: ApiResponse) {
        self.entries.insert(key, response);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<ApiResponse> {
        self.entries.remove(key).map(|(_, response)| response)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Serves and saves opted-in GET responses.
pub struct CacheInterceptor {
    cache: ResponseCache,
}

impl CacheInterceptor {
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    async fn intercept(&self, mut request: ApiRequest, next: Next<'_>) -> ClientResult<ApiResponse> {
        if request.method != Method::GET {
            return next.run(request).await;
        }

        let key = request.url_with_params().to_string();
        let opted_in = request.headers.remove(ALLOW_LOCAL_CACHE_HEADER).is_some();

        if opted_in {
            if let Some(cached) = self.cache.get(&key) {
                debug!(url = %key, "response resolved from cache");
                return Ok(cached);
            }
        } else if !self.cache.contains(&key) {
            return next.run(request).await;
        }

        let response = next.run(request).await?;
        self.cache.insert(key.clone(), response.clone());
        debug!(url = %key, "response cached");
        Ok(response)
    }

    fn name(&self) -> &str {
        "cache"
    }
}
