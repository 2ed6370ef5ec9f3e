//! Player2 authentication
//!
//! Prefers the local Player2 app: a health probe followed by a login that
//! issues a key. Falls back to the configured hosted-API key otherwise.

use crate::config::Settings;
use crate::models::player2::LocalLoginResponse;
use crate::utils::auth_cache::LocalAuthCache;
use crate::utils::error::{helpers, StreamResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hosted API used when the configuration leaves the base URL empty
pub const DEFAULT_REMOTE_URL: &str = "https://api.player2.game";

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Client for the local companion app
#[async_trait]
pub trait LocalApp: Send + Sync {
    /// Base URL chat requests go to when the local app is used
    fn base_url(&self) -> &str;

    /// Succeeds when the app is running
    async fn health(&self) -> Result<()>;

    /// Ask the app for a key; `Ok(None)` when it answered without one
    async fn login(&self) -> Result<Option<String>>;
}

/// HTTP client for the local app
#[derive(Debug, Clone)]
pub struct HttpLocalApp {
    client: Client,
    local_url: String,
    client_id: String,
    health_timeout: Duration,
    login_timeout: Duration,
}

impl HttpLocalApp {
    pub fn new(client: Client, settings: &Settings) -> Self {
        let p2 = &settings.player2;
        Self {
            client,
            local_url: p2.local_url.trim_end_matches('/').to_string(),
            client_id: p2.client_id.clone(),
            health_timeout: Duration::from_secs(p2.health_timeout_secs),
            login_timeout: Duration::from_secs(p2.login_timeout_secs),
        }
    }
}

#[async_trait]
impl LocalApp for HttpLocalApp {
    fn base_url(&self) -> &str {
        &self.local_url
    }

    async fn health(&self) -> Result<()> {
        let url = format!("{}/v1/health", self.local_url);
        self.client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .context("Local app health check failed")?
            .error_for_status()
            .context("Local app reported unhealthy")?;
        Ok(())
    }

    async fn login(&self) -> Result<Option<String>> {
        let url = format!("{}/v1/login/web/{}", self.local_url, self.client_id);
        let response = self
            .client
            .post(&url)
            .timeout(self.login_timeout)
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await
            .context("Failed to send local login request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Local login rejected: {} - {}", status, error_text);
        }

        let login: LocalLoginResponse = response
            .json()
            .await
            .context("Failed to parse local login response")?;
        Ok(login.p2_key.filter(|k| !k.is_empty()))
    }
}

/// Where a Player2 call goes and with which key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub base_url: String,
    pub api_key: String,
    /// Whether the key came from the local app
    pub is_local: bool,
}

/// Resolves Player2 credentials and owns the local key cache
pub struct AuthResolver {
    local_app: Arc<dyn LocalApp>,
    clock: Arc<dyn Clock>,
    cache: LocalAuthCache,
    ttl: Duration,
}

impl AuthResolver {
    pub fn new(local_app: Arc<dyn LocalApp>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { local_app, clock, cache: LocalAuthCache::new(), ttl }
    }

    /// Resolver talking to the real local app with the wall clock
    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        Self::new(
            Arc::new(HttpLocalApp::new(client, settings)),
            Arc::new(SystemClock),
            settings.key_ttl(),
        )
    }

    /// Resolve the base URL and key for one call
    ///
    /// `remote_base_url` and `fallback_key` come from the provider
    /// configuration and are used when the local app is unavailable.
    pub async fn resolve(
        &self,
        remote_base_url: &str,
        fallback_key: &str,
    ) -> StreamResult<ResolvedConnection> {
        if let Some(api_key) = self.cache.get(self.clock.now()) {
            debug!("Using cached local app key");
            return Ok(self.local_connection(api_key));
        }

        let rejection = match self.local_app.health().await {
            Ok(()) => match self.local_app.login().await {
                Ok(Some(api_key)) => {
                    let expiry = chrono::Duration::from_std(self.ttl)
                        .ok()
                        .and_then(|ttl| self.clock.now().checked_add_signed(ttl));
                    match expiry {
                        Some(expiry) => {
                            self.cache.store(&api_key, expiry);
                            info!(
                                "Authenticated with local Player2 app, key cached until {:?}",
                                self.cache.expiry()
                            );
                        }
                        None => warn!("Key TTL {:?} out of range, local key not cached", self.ttl),
                    }
                    return Ok(self.local_connection(api_key));
                }
                Ok(None) => {
                    warn!("Local Player2 app returned no key");
                    Some("local app returned no key".to_string())
                }
                Err(e) => {
                    warn!("Local Player2 login failed: {:#}", e);
                    Some(format!("{:#}", e))
                }
            },
            Err(e) => {
                debug!("Local Player2 app unavailable: {:#}", e);
                None
            }
        };

        if !fallback_key.is_empty() {
            let base_url = match remote_base_url.trim().trim_end_matches('/') {
                "" => DEFAULT_REMOTE_URL.to_string(),
                url => url.to_string(),
            };
            debug!("Using hosted Player2 API at {}", base_url);
            return Ok(ResolvedConnection {
                base_url,
                api_key: fallback_key.to_string(),
                is_local: false,
            });
        }

        Err(match rejection {
            Some(reason) => helpers::auth_error(format!(
                "Local Player2 app rejected login and no API key is configured: {}",
                reason
            )),
            None => helpers::config_error(
                "Player2 local app is not running and no API key is configured",
            ),
        })
    }

    fn local_connection(&self, api_key: String) -> ResolvedConnection {
        ResolvedConnection {
            base_url: self.local_app.base_url().to_string(),
            api_key,
            is_local: true,
        }
    }

    /// Forget the cached local key; the next call probes the app again
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Currently valid cached key
    pub fn cached_key(&self) -> Option<String> {
        self.cache.get(self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubApp {
        healthy: bool,
        key: Option<&'static str>,
        logins: AtomicUsize,
    }

    #[async_trait]
    impl LocalApp for StubApp {
        fn base_url(&self) -> &str {
            "http://localhost:4315"
        }

        async fn health(&self) -> Result<()> {
            if self.healthy {
                Ok(())
            } else {
                anyhow::bail!("connection refused")
            }
        }

        async fn login(&self) -> Result<Option<String>> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(self.key.map(str::to_string))
        }
    }

    fn make_resolver(healthy: bool, key: Option<&'static str>) -> (AuthResolver, Arc<StubApp>) {
        let app = Arc::new(StubApp { healthy, key, logins: AtomicUsize::new(0) });
        let resolver = AuthResolver::new(app.clone(), Arc::new(SystemClock), Duration::from_secs(60));
        (resolver, app)
    }

    #[tokio::test]
    async fn test_local_key_is_cached() {
        let (resolver, app) = make_resolver(true, Some("p2-local"));
        let first = resolver.resolve("", "").await.unwrap();
        let second = resolver.resolve("", "").await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_local);
        assert_eq!(first.base_url, "http://localhost:4315");
        assert_eq!(app.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_to_remote() {
        let (resolver, _) = make_resolver(false, None);
        let conn = resolver.resolve("", "remote-key").await.unwrap();
        assert_eq!(conn.base_url, DEFAULT_REMOTE_URL);
        assert_eq!(conn.api_key, "remote-key");
        assert!(!conn.is_local);
    }

    #[tokio::test]
    async fn test_error_kinds_without_fallback() {
        let (resolver, _) = make_resolver(false, None);
        let err = resolver.resolve("", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let (resolver, _) = make_resolver(true, None);
        let err = resolver.resolve("", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_skips_cache() {
        let app = Arc::new(StubApp { healthy: true, key: Some("p2-local"), logins: AtomicUsize::new(0) });
        let resolver = AuthResolver::new(
            app.clone(),
            Arc::new(SystemClock),
            Duration::from_secs(i64::MAX as u64),
        );

        let conn = resolver.resolve("", "").await.unwrap();
        assert_eq!(conn.api_key, "p2-local");
        assert!(conn.is_local);
        assert!(resolver.cached_key().is_none());
    }
}
