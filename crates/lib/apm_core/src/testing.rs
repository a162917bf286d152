//! Shared fixtures for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;

use crate::error::ClientResult;
use crate::http::{ApiRequest, ApiResponse, Transport};
use crate::models::auth::TokenResponse;

pub(crate) const SERVER: &str = "https://apm.example.com";

/// Signed bearer token for `subject`. `serial` makes otherwise identical
/// tokens distinct.
pub(crate) fn mint_token(subject: &str, role: &str, serial: u32) -> String {
    encode(
        &Header::default(),
        &json!({
            "nameid": subject,
            "role": role,
            "email": format!("{subject}@example.com"),
            "uniquie_name": format!("User {subject}"),
            "exp": 1_900_000_000i64,
            "jti": serial,
        }),
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

/// In-process backend answering the auth endpoints and guarding every
/// other path with the most recently issued bearer token.
pub(crate) struct StubBackend {
    pub login_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub logout_calls: AtomicU32,
    pub requests: Mutex<Vec<ApiRequest>>,
    /// Status returned by `/auth/refresh` instead of new tokens.
    pub refresh_failure: Mutex<Option<StatusCode>>,
    pub refresh_delay: Duration,
    issued: AtomicU32,
    valid_token: Mutex<Option<String>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            login_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            logout_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            refresh_failure: Mutex::new(None),
            refresh_delay: Duration::from_millis(20),
            issued: AtomicU32::new(0),
            valid_token: Mutex::new(None),
        }
    }

    /// Invalidate the current bearer token so protected paths answer 401.
    pub fn expire_tokens(&self) {
        *self.valid_token.lock().unwrap() = None;
    }

    pub fn fail_refresh_with(&self, status: StatusCode) {
        *self.refresh_failure.lock().unwrap() = Some(status);
    }

    pub fn refreshes(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn issue(&self) -> ClientResult<ApiResponse> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = mint_token("1", "Admin", n);
        *self.valid_token.lock().unwrap() = Some(token.clone());
        ApiResponse::json(
            StatusCode::OK,
            &TokenResponse {
                json_web_token: token,
                refresh_token: format!("rt{n}"),
            },
        )
    }
}

#[async_trait]
impl Transport for StubBackend {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let path = request.url.path().to_string();

        match (request.method.clone(), path.as_str()) {
            (Method::POST, "/api/v1/auth") => {
                self.login_calls.fetch_add(1, Ordering::SeqCst);
                self.issue()
            }
            (Method::POST, "/api/v1/auth/refresh") => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.refresh_delay).await;
                let failure = *self.refresh_failure.lock().unwrap();
                match failure {
                    Some(status) => Ok(ApiResponse::new(status, "refresh rejected")),
                    None => self.issue(),
                }
            }
            (Method::POST, "/api/v1/auth/logout") => {
                self.logout_calls.fetch_add(1, Ordering::SeqCst);
                Ok(ApiResponse::new(StatusCode::OK, ""))
            }
            (Method::POST, "/api/v1/auth/register") => Ok(ApiResponse::new(StatusCode::OK, "")),
            _ => {
                let valid = self.valid_token.lock().unwrap().clone();
                if valid.is_some() && request.bearer() == valid.as_deref() {
                    Ok(ApiResponse::new(StatusCode::OK, format!("ok:{path}")))
                } else {
                    Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "token expired"))
                }
            }
        }
    }
}
