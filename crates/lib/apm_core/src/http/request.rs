//! Outgoing request representation.

use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Single-file multipart upload.
    File {
        field: String,
        file_name: String,
        content: Vec<u8>,
    },
}

/// A request travelling through the pipeline.
///
/// Requests are plain data so interceptors can clone and resubmit them.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::File {
            field: field.into(),
            file_name: file_name.into(),
            content,
        };
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Full URL including the query string; identifies the request for the
    /// cache and the loading indicator.
    pub fn url_with_params(&self) -> &str {
        self.url.as_str()
    }

    /// Attach `Authorization: Bearer <token>`, replacing any existing value.
    pub fn set_bearer(&mut self, token: &str) -> ClientResult<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::InvalidHeader(format!("authorization: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://apm.example.com/api/v1/accesspoints/search").unwrap()
    }

    #[test]
    fn query_params_are_part_of_the_identifier() {
        let request = ApiRequest::get(url()).with_query("keyword", "home net");
        assert_eq!(
            request.url_with_params(),
            "https://apm.example.com/api/v1/accesspoints/search?keyword=home+net"
        );
    }

    #[test]
    fn set_bearer_replaces_existing_value() {
        let mut request = ApiRequest::get(url());
        request.set_bearer("first").unwrap();
        request.set_bearer("second").unwrap();
        assert_eq!(request.bearer(), Some("second"));
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn set_bearer_rejects_header_breaking_tokens() {
        let mut request = ApiRequest::get(url());
        assert!(matches!(
            request.set_bearer("bad\ntoken"),
            Err(ClientError::InvalidHeader(_))
        ));
    }

    #[test]
    fn json_body_is_captured_as_value() {
        let request = ApiRequest::post(url())
            .with_json(&serde_json::json!({ "id": "ap-1" }))
            .unwrap();
        match request.body {
            RequestBody::Json(value) => assert_eq!(value["id"], "ap-1"),
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
