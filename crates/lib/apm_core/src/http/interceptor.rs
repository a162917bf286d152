//! Ordered interceptor chain.
//!
//! Each interceptor receives the request and a [`Next`] handle to the rest of
//! the chain. It may rewrite the request, answer without calling `next`, or
//! call `next` more than once (e.g. to resubmit after a token refresh).

use std::sync::Arc;

use async_trait::async_trait;

use super::request::ApiRequest;
use super::response::ApiResponse;
use super::transport::Transport;
use crate::error::ClientResult;

/// One stage of the request pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> ClientResult<ApiResponse>;

    /// Identifier for debugging/logging.
    fn name(&self) -> &str;
}

/// The remainder of the chain after the current interceptor.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Pass `request` to the next stage. The innermost stage is the
    /// transport; non-2xx responses surface as [`crate::ClientError::Http`].
    pub async fn run(self, request: ApiRequest) -> ClientResult<ApiResponse> {
        match self.interceptors.split_first() {
            Some((head, tail)) => {
                let next = Next {
                    interceptors: tail,
                    transport: self.transport,
                };
                head.intercept(request, next).await
            }
            None => self.transport.send(request).await?.error_for_status(),
        }
    }
}

/// Interceptors in order (outermost first) plus the transport.
#[derive(Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            interceptors: Vec::new(),
            transport,
        }
    }

    /// Append an interceptor inside the ones already registered.
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let next = Next {
            interceptors: &self.interceptors,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}
