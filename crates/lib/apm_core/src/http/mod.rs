//! Request pipeline.
//!
//! Requests flow through an ordered list of [`Interceptor`]s before reaching
//! a [`Transport`]. The authenticated pipeline built by
//! [`crate::client::ApiClient`] is, outermost first:
//!
//! 1. [`RefreshInterceptor`]: recovers from `401` via single-flight refresh
//! 2. [`TokenInterceptor`]: attaches `Authorization: Bearer <token>`
//! 3. [`LoadingInterceptor`]: tracks in-flight requests
//! 4. [`CacheInterceptor`]: serves/saves opted-in GET responses

pub mod cache;
pub mod interceptor;
pub mod loading;
pub mod refresh;
pub mod request;
pub mod response;
pub mod token;
pub mod transport;

pub use cache::{ALLOW_LOCAL_CACHE_HEADER, ALLOW_LOCAL_CACHE_VALUE, CacheInterceptor, ResponseCache};
pub use interceptor::{Interceptor, Next, Pipeline};
pub use loading::{LoadingGuard, LoadingIndicator, LoadingInterceptor};
pub use refresh::RefreshInterceptor;
pub use request::{ApiRequest, RequestBody};
pub use response::ApiResponse;
pub use token::TokenInterceptor;
pub use transport::{ReqwestTransport, Transport};
