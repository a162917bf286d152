//! Login, refresh and logout flows.
//!
//! `AuthService` talks to the `/auth` endpoints through its own pipeline
//! (token + loading, no 401 recovery) and keeps three pieces of state in
//! step: the [`SessionStore`], the [`ServerScope`] and the persisted refresh
//! token / server identifier.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::session::Session;
use super::store::SessionStore;
use crate::config::RetryPolicy;
use crate::error::{ClientError, ClientResult};
use crate::http::{ApiRequest, Pipeline};
use crate::models::auth::{
    LoginRequest, LogoutRequest, PasswordResetRequest, RefreshRequest, RegisterRequest,
    TokenResponse,
};
use crate::scope::ServerScope;
use crate::storage::{LocalStorage, keys};

/// Shortest password accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct AuthService {
    scope: ServerScope,
    sessions: SessionStore,
    storage: LocalStorage,
    pipeline: Pipeline,
    retry: RetryPolicy,
    refresh_token_ttl: Option<chrono::Duration>,
}

impl AuthService {
    pub fn new(
        scope: ServerScope,
        sessions: SessionStore,
        storage: LocalStorage,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            scope,
            sessions,
            storage,
            pipeline,
            retry: RetryPolicy::none(),
            refresh_token_ttl: None,
        }
    }

    /// Retry transient refresh failures according to `retry`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Expire the stored refresh token client-side after `ttl`.
    pub fn with_refresh_token_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.sessions.current()
    }

    pub fn server_name(&self) -> Option<String> {
        self.scope.server_name()
    }

    /// Authenticate against `server` with email and password.
    ///
    /// On success the server becomes the client's scope, the refresh token
    /// and server identifier are persisted, and the new session is returned.
    pub async fn login(&self, server: &str, credentials: &LoginRequest) -> ClientResult<Arc<Session>> {
        let (server_url, url) = self.endpoint_on(server, "auth")?;
        let request = ApiRequest::post(url).with_json(credentials)?;
        let tokens: TokenResponse = self.pipeline.send(request).await?.decode()?;
        let session = Session::from_token(&tokens.json_web_token)?;

        self.scope.set_server(server_url.as_str())?;
        let session = self.establish(session, &tokens.refresh_token);
        if let Some(name) = self.scope.server_name() {
            // Write failures are logged by the storage layer.
            let _ = self.storage.set(keys::SERVER, &name, None);
        }
        info!(subject = %session.subject_id, role = %session.role, "logged in");
        Ok(session)
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Fails without a network call when no server is configured or no
    /// refresh token is stored. Transient failures are retried per the
    /// configured [`RetryPolicy`]. Any final failure performs a
    /// [client-side logout](Self::client_side_logout).
    pub async fn refresh(&self) -> ClientResult<Arc<Session>> {
        let result = self.try_refresh().await;
        if let Err(e) = &result {
            warn!(error = %e, "token refresh failed, clearing session");
            self.client_side_logout();
        }
        result
    }

    async fn try_refresh(&self) -> ClientResult<Arc<Session>> {
        let url = self.scope.endpoint("auth/refresh")?;
        let refresh_token = self.stored_refresh_token().ok_or(ClientError::MissingRefreshToken)?;
        let body = RefreshRequest { refresh_token };

        let mut attempt = 0;
        loop {
            let request = ApiRequest::post(url.clone()).with_json(&body)?;
            match self.pipeline.send(request).await {
                Ok(response) => {
                    let tokens: TokenResponse = response.decode()?;
                    let session = Session::from_token(&tokens.json_web_token)?;
                    let session = self.establish(session, &tokens.refresh_token);
                    debug!(subject = %session.subject_id, "session refreshed");
                    return Ok(session);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(attempt, max = self.retry.max_retries, error = %e, "refresh attempt failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-establish the session persisted by an earlier login.
    ///
    /// Returns `None` when nothing is stored or the refresh fails; a failed
    /// refresh has already cleared the stored state.
    pub async fn restore_session(&self) -> Option<Arc<Session>> {
        if !self.verify_stored_tokens() {
            debug!("no stored session to restore");
            return None;
        }

        let server: String = self.storage.get(keys::SERVER)?;
        if let Err(e) = self.scope.set_server(&server) {
            warn!(server = %server, error = %e, "stored server is invalid, clearing session");
            self.client_side_logout();
            return None;
        }

        match self.refresh().await {
            Ok(session) => {
                info!(subject = %session.subject_id, server = %server, "session restored");
                Some(session)
            }
            Err(e) => {
                warn!(error = %e, "could not restore session");
                None
            }
        }
    }

    /// Notify the backend, then clear local state.
    ///
    /// The local logout happens even when the server call fails; that
    /// failure is returned after the fact.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.server_logout().await;
        if let Err(e) = &result {
            warn!(error = %e, "server logout failed");
        }
        self.client_side_logout();
        result
    }

    async fn server_logout(&self) -> ClientResult<()> {
        let Some(refresh_token) = self.stored_refresh_token() else {
            debug!("no refresh token stored, skipping server logout");
            return Ok(());
        };
        let url = self.scope.endpoint("auth/logout")?;
        let request = ApiRequest::post(url).with_json(&LogoutRequest { refresh_token })?;
        self.pipeline.send(request).await?;
        Ok(())
    }

    /// Clear the session, the stored refresh token and the stored server.
    /// Idempotent. Does not contact the backend.
    pub fn client_side_logout(&self) {
        let had_session = self.sessions.is_authenticated();
        self.sessions.clear();
        // Storage failures are logged by the storage layer.
        let _ = self.storage.unset(keys::REFRESH_TOKEN);
        let _ = self.storage.unset(keys::SERVER);
        self.scope.clear();
        if had_session {
            info!("logged out");
        }
    }

    /// Create an account on `server`. Does not log in.
    pub async fn register(&self, server: &str, request: &RegisterRequest) -> ClientResult<()> {
        if request.name.trim().is_empty() {
            return Err(ClientError::Validation("Name is required.".into()));
        }
        if request.email.trim().is_empty() {
            return Err(ClientError::Validation("Email is required.".into()));
        }
        validate_passwords(&request.password, &request.password_repeat)?;

        let (_, url) = self.endpoint_on(server, "auth/register")?;
        self.pipeline
            .send(ApiRequest::post(url).with_json(request)?)
            .await?;
        info!(email = %request.email, "account registered");
        Ok(())
    }

    /// Change the current user's password, then log out locally.
    ///
    /// The request goes through `pipeline` rather than the auth pipeline so
    /// an expired token is refreshed first; [`crate::ApiClient`] passes its
    /// API pipeline.
    pub async fn reset_password(
        &self,
        pipeline: &Pipeline,
        request: &PasswordResetRequest,
    ) -> ClientResult<()> {
        validate_passwords(&request.password, &request.password_repeat)?;
        if !self.sessions.is_authenticated() {
            return Err(ClientError::AuthenticationRequired);
        }

        let url = self.scope.endpoint("auth/reset")?;
        pipeline
            .send(ApiRequest::post(url).with_json(request)?)
            .await?;
        info!("password changed");
        self.client_side_logout();
        Ok(())
    }

    /// True if both a refresh token and a server identifier are stored.
    pub fn verify_stored_tokens(&self) -> bool {
        self.storage.check(keys::REFRESH_TOKEN) && self.storage.check(keys::SERVER)
    }

    fn stored_refresh_token(&self) -> Option<String> {
        self.storage
            .get::<String>(keys::REFRESH_TOKEN)
            .filter(|token| !token.is_empty())
    }

    /// Persist the refresh token and publish `session`.
    fn establish(&self, session: Session, refresh_token: &str) -> Arc<Session> {
        // Write failures are logged by the storage layer.
        let _ = self
            .storage
            .set(keys::REFRESH_TOKEN, refresh_token, self.refresh_token_ttl);
        self.sessions.replace(session)
    }

    /// Resolve `path` on `server` without changing the client's scope.
    fn endpoint_on(&self, server: &str, path: &str) -> ClientResult<(Url, Url)> {
        let scope = ServerScope::new(self.scope.api_version());
        let server_url = scope.set_server(server)?;
        Ok((server_url, scope.endpoint(path)?))
    }
}

fn validate_passwords(password: &str, repeat: &str) -> ClientResult<()> {
    if password != repeat {
        return Err(ClientError::Validation("Passwords do not match.".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClientError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }
    Ok(())
}
