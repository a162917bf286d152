//! Composition root.
//!
//! [`ApiClient`] creates every piece of shared state once and wires the two
//! pipelines:
//!
//! - the auth pipeline used by [`AuthService`]: token, loading, transport
//! - the API pipeline used by everything else: refresh, token, loading,
//!   cache, transport
//!
//! The auth pipeline has no refresh stage, so a failing `/auth/refresh`
//! call never recurses into another refresh.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::api::AccessPointService;
use crate::auth::{AuthService, RefreshCoordinator, RefreshScheduler, Session, SessionStore};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::http::{
    CacheInterceptor, LoadingIndicator, LoadingInterceptor, Pipeline, RefreshInterceptor,
    ReqwestTransport, ResponseCache, TokenInterceptor, Transport,
};
use crate::models::auth::{LoginRequest, PasswordResetRequest};
use crate::preferences::PreferencesService;
use crate::scope::ServerScope;
use crate::storage::{FileStorage, LocalStorage};

pub struct ApiClient {
    config: ClientConfig,
    scope: ServerScope,
    sessions: SessionStore,
    storage: LocalStorage,
    loading: LoadingIndicator,
    cache: ResponseCache,
    auth: Arc<AuthService>,
    coordinator: Arc<RefreshCoordinator>,
    pipeline: Pipeline,
    preferences: PreferencesService,
    scheduler: Mutex<Option<RefreshScheduler>>,
}

impl ApiClient {
    /// Client backed by the JSON file store at `config.storage_path` and a
    /// reqwest transport.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let storage = LocalStorage::new(Arc::new(FileStorage::new(config.storage_path.clone())));
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        Self::with_transport(config, storage, transport)
    }

    /// Client over an arbitrary storage backend and transport.
    pub fn with_transport(
        config: ClientConfig,
        storage: LocalStorage,
        transport: Arc<dyn Transport>,
    ) -> ClientResult<Self> {
        let scope = ServerScope::new(config.api_version);
        if let Some(server) = &config.server {
            scope.set_server(server)?;
        }
        let sessions = SessionStore::new();
        let loading = LoadingIndicator::new();
        let cache = ResponseCache::new();

        let token = Arc::new(TokenInterceptor::new(sessions.clone(), scope.clone()));
        let tracking = Arc::new(LoadingInterceptor::new(loading.clone()));

        let auth_pipeline = Pipeline::new(transport.clone())
            .with(token.clone())
            .with(tracking.clone());
        let auth = Arc::new(
            AuthService::new(scope.clone(), sessions.clone(), storage.clone(), auth_pipeline)
                .with_retry(config.refresh_retry)
                .with_refresh_token_ttl(config.refresh_token_ttl),
        );
        let coordinator = Arc::new(RefreshCoordinator::new(auth.clone()));

        let pipeline = Pipeline::new(transport)
            .with(Arc::new(RefreshInterceptor::new(coordinator.clone(), scope.clone())))
            .with(token)
            .with(tracking)
            .with(Arc::new(CacheInterceptor::new(cache.clone())));
        debug!(stages = ?pipeline.names(), "request pipeline ready");

        Ok(Self {
            config,
            preferences: PreferencesService::new(storage.clone()),
            scope,
            sessions,
            storage,
            loading,
            cache,
            auth,
            coordinator,
            pipeline,
            scheduler: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn scope(&self) -> &ServerScope {
        &self.scope
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// The API pipeline, for requests not covered by a typed service.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn preferences(&self) -> &PreferencesService {
        &self.preferences
    }

    pub fn access_points(&self) -> AccessPointService {
        AccessPointService::new(
            self.scope.clone(),
            self.pipeline.clone(),
            self.preferences.clone(),
        )
    }

    pub async fn login(&self, server: &str, email: &str, password: &str) -> ClientResult<Arc<Session>> {
        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = self.auth.login(server, &credentials).await?;
        self.start_refresh_scheduler();
        Ok(session)
    }

    /// Restore a persisted session; see [`AuthService::restore_session`].
    pub async fn restore_session(&self) -> Option<Arc<Session>> {
        let session = self.auth.restore_session().await?;
        self.start_refresh_scheduler();
        Some(session)
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.auth.logout().await
    }

    /// Change the current user's password. Ends the local session on success.
    pub async fn reset_password(&self, password: &str, password_repeat: &str) -> ClientResult<()> {
        let request = PasswordResetRequest {
            password: password.to_string(),
            password_repeat: password_repeat.to_string(),
        };
        self.auth.reset_password(&self.pipeline, &request).await
    }

    /// Start the proactive refresh worker when a refresh margin is
    /// configured. Returns true if a worker is running afterwards.
    pub fn start_refresh_scheduler(&self) -> bool {
        let Some(margin) = self.config.refresh_margin else {
            return false;
        };
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(RefreshScheduler::is_running) {
            return true;
        }
        *slot = Some(RefreshScheduler::spawn(self.coordinator.clone(), margin));
        info!(margin_secs = margin.as_secs(), "proactive token refresh enabled");
        true
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        let scheduler = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }
}
