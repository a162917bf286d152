//! Network transport at the bottom of the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::request::{ApiRequest, RequestBody};
use super::response::ApiResponse;
use crate::error::{ClientError, ClientResult};

/// Sends a request and buffers the response.
///
/// Implementations return every response the server produced, whatever its
/// status; only network-level failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Transport(format!("client init failed: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;
        debug!(%method, %url, "sending request");

        let mut builder = self.client.request(method, url).headers(headers);
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::File {
                field,
                file_name,
                content,
            } => builder.multipart(Form::new().part(field, Part::bytes(content).file_name(file_name))),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("reading response body failed: {e}")))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
