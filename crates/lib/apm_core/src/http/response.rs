//! Buffered response representation.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// A fully buffered response. Cheap enough to clone into the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json<T: serde::Serialize + ?Sized>(status: StatusCode, value: &T) -> ClientResult<Self> {
        Ok(Self::new(status, serde_json::to_vec(value)?))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into [`ClientError::Http`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Http {
                status: self.status,
                body: self.text(),
            })
        }
    }
}
