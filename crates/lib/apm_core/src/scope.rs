//! The backend server the client is currently scoped to.

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default REST API version segment (`/api/v1`).
pub const DEFAULT_API_VERSION: u32 = 1;

/// Reactive holder of the configured backend base URL.
#[derive(Clone)]
pub struct ServerScope {
    tx: Arc<watch::Sender<Option<Url>>>,
    api_version: u32,
}

impl ServerScope {
    pub fn new(api_version: u32) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            api_version,
        }
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Scope the client to `server` (e.g. `https://apm.example.com`).
    pub fn set_server(&self, server: &str) -> ClientResult<Url> {
        let url = parse_server(server)?;
        self.tx.send_replace(Some(url.clone()));
        Ok(url)
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn server(&self) -> Option<Url> {
        self.tx.borrow().clone()
    }

    /// Server URL without a trailing slash.
    pub fn server_name(&self) -> Option<String> {
        self.server()
            .map(|url| url.as_str().trim_end_matches('/').to_string())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Url>> {
        self.tx.subscribe()
    }

    /// Absolute URL of `<server>/api/v<version>/<path>`.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let base = self.server_name().ok_or(ClientError::ServerNotConfigured)?;
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!(
            "{base}/api/v{}/{path}",
            self.api_version
        ))?)
    }

    /// True if `url` points at the configured backend: same origin, and a
    /// path under the server's base path.
    pub fn is_backend_url(&self, url: &Url) -> bool {
        let Some(server) = self.server() else {
            return false;
        };
        if url.origin() != server.origin() {
            return false;
        }
        let base = server.path().trim_end_matches('/');
        base.is_empty()
            || url.path() == base
            || url
                .path()
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Default for ServerScope {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION)
    }
}

fn parse_server(server: &str) -> ClientResult<Url> {
    let trimmed = server.trim();
    if trimmed.is_empty() {
        return Err(ClientError::ServerNotConfigured);
    }
    let url = Url::parse(trimmed)?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{other}' in {trimmed}"
            )));
        }
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ClientError::InvalidUrl(format!(
            "server URL must not carry a query or fragment: {trimmed}"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn endpoint_requires_server() {
        let scope = ServerScope::default();
        assert!(matches!(
            scope.endpoint("auth"),
            Err(ClientError::ServerNotConfigured)
        ));
    }

    #[test]
    fn endpoint_joins_versioned_api_path() {
        let scope = ServerScope::default();
        scope.set_server("https://apm.example.com/").unwrap();
        assert_eq!(
            scope.endpoint("auth/refresh").unwrap().as_str(),
            "https://apm.example.com/api/v1/auth/refresh"
        );
        assert_eq!(
            scope.server_name().as_deref(),
            Some("https://apm.example.com")
        );
    }

    #[test]
    fn endpoint_keeps_server_base_path() {
        let scope = ServerScope::new(2);
        scope.set_server("https://host.example.com/apm").unwrap();
        assert_eq!(
            scope.endpoint("/accesspoints/").unwrap().as_str(),
            "https://host.example.com/apm/api/v2/accesspoints/"
        );
    }

    #[test]
    fn backend_match_requires_same_origin() {
        let scope = ServerScope::default();
        scope.set_server("https://apm.example.com").unwrap();

        assert!(scope.is_backend_url(&url("https://apm.example.com/api/v1/accesspoints")));
        assert!(!scope.is_backend_url(&url("http://apm.example.com/api/v1/accesspoints")));
        assert!(!scope.is_backend_url(&url("https://apm.example.com.evil.io/api")));
        assert!(!scope.is_backend_url(&url("https://tiles.example.com/1/2/3.png")));
    }

    #[test]
    fn backend_match_respects_base_path_boundary() {
        let scope = ServerScope::default();
        scope.set_server("https://host.example.com/apm").unwrap();

        assert!(scope.is_backend_url(&url("https://host.example.com/apm/api/v1/auth")));
        assert!(!scope.is_backend_url(&url("https://host.example.com/apmx/api")));
        assert!(!scope.is_backend_url(&url("https://host.example.com/other")));
    }

    #[test]
    fn nothing_matches_without_server() {
        let scope = ServerScope::default();
        assert!(!scope.is_backend_url(&url("https://apm.example.com/api")));
    }

    #[test]
    fn rejects_non_http_servers() {
        let scope = ServerScope::default();
        assert!(scope.set_server("ftp://apm.example.com").is_err());
        assert!(scope.set_server("   ").is_err());
        assert!(scope.server().is_none());
    }
}
