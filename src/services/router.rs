//! Provider Router
//!
//! Dispatches one streaming call to the provider selected by the
//! configuration and assembles the resulting payload

use super::auth::AuthResolver;
use super::liveness::Timeouts;
use super::transport::StreamTransport;
use crate::config::{ProviderConfig, Settings};
use crate::models::{Message, Payload};
use crate::providers::Protocol;
use crate::utils::error::{ErrorContext, StreamResult};
use crate::utils::logging::{mask_key, request_log_summary};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Streaming chat-completion client
///
/// Cheap to clone; clones share the HTTP connection pool, the Player2
/// credential cache and the cancellation token.
#[derive(Clone)]
pub struct StreamingClient {
    client: Client,
    settings: Settings,
    auth: Arc<AuthResolver>,
    cancel: CancellationToken,
}

impl StreamingClient {
    /// Create a new client instance
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("chatstream/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let auth = Arc::new(AuthResolver::from_settings(client.clone(), &settings));

        Ok(Self { client, settings, auth, cancel: CancellationToken::new() })
    }

    /// Replace the Player2 credential resolver
    pub fn with_auth_resolver(mut self, auth: Arc<AuthResolver>) -> Self {
        self.auth = auth;
        self
    }

    /// Use a host-owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn auth_resolver(&self) -> &Arc<AuthResolver> {
        &self.auth
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stream one chat completion
    ///
    /// `on_chunk` is called synchronously for every non-empty text delta, in
    /// arrival order. On failure the error carries the text streamed so far.
    pub async fn stream_chat_completion<F>(
        &self,
        config: &ProviderConfig,
        instruction: &str,
        messages: &[Message],
        mut on_chunk: F,
    ) -> StreamResult<Payload>
    where
        F: FnMut(&str) + Send,
    {
        let span = info_span!(
            "chat_completion",
            call_id = %Uuid::new_v4(),
            protocol = %config.protocol,
        );
        self.run(config, instruction, messages, &mut on_chunk)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        config: &ProviderConfig,
        instruction: &str,
        messages: &[Message],
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> StreamResult<Payload> {
        let provider = config.protocol.provider(&self.settings);
        let request_body = provider.build_request(instruction, messages, &config.model)?;
        let extra_headers = extra_header_map(config)?;

        let (base_url, api_key, is_local) = match config.protocol {
            Protocol::Player2 => {
                // a configured hosted URL must be valid before the local app is probed
                if !config.base_url.trim().is_empty() {
                    provider.endpoint(&config.base_url, &config.model, &config.api_key)?;
                }
                let conn = self.auth.resolve(&config.base_url, &config.api_key).await?;
                (conn.base_url, conn.api_key, conn.is_local)
            }
            Protocol::OpenAi | Protocol::Gemini => {
                (config.base_url.clone(), config.api_key.clone(), false)
            }
        };

        let endpoint = provider.endpoint(&base_url, &config.model, &api_key)?;
        let timeouts = Timeouts::for_endpoint(&endpoint.url, &self.settings, config);

        debug!(
            "Sending {} request to {} (key {}, connect timeout {:?}, read timeout {:?})",
            provider.name(),
            endpoint.display,
            mask_key(&api_key),
            timeouts.connect,
            timeouts.read
        );
        debug!("Request body: {}", request_log_summary(&request_body));

        let mut request = self
            .client
            .post(&endpoint.url)
            .header("Content-Type", "application/json");
        if provider.uses_bearer_auth() && !api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }
        for (name, value) in provider.default_headers() {
            request = request.header(name, value);
        }
        request = request.headers(extra_headers).body(request_body.clone());

        let started = Instant::now();
        let mut transport = StreamTransport::new(provider.decoder(), timeouts, self.cancel.clone());
        let result = transport.send(request, on_chunk).await;

        let payload = Payload {
            endpoint: endpoint.display,
            model: provider.payload_model(&config.model),
            request_body,
            text: transport.text().to_string(),
            total_tokens: transport.total_tokens(),
        };

        match result {
            Ok(()) => {
                info!(
                    "Completed in {:?}: {} chars, {} tokens",
                    started.elapsed(),
                    payload.text.len(),
                    payload.total_tokens
                );
                Ok(payload)
            }
            Err(e) => {
                if is_local && e.invalidates_local_credentials() {
                    warn!("Dropping cached Player2 key after {} error", e.kind());
                    self.auth.invalidate();
                }

                if e.is_cancelled() {
                    debug!("Call cancelled after {} chars", payload.text.len());
                } else if e.is_timeout() {
                    warn!("Streaming call stalled after {} chars: {}", payload.text.len(), e);
                } else if e.should_log_details() {
                    error!("Streaming call failed after {:?}: {}", started.elapsed(), e);
                } else {
                    warn!("Streaming call failed: {}", e.error_type());
                }

                Err(e.with_partial(payload))
            }
        }
    }
}

/// Parse the configured extra headers
fn extra_header_map(config: &ProviderConfig) -> StreamResult<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.extra_headers.len());
    for (name, value) in &config.extra_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .config_context(&format!("Invalid header name '{}'", name))?;
        let header_value =
            HeaderValue::from_str(value).config_context(&format!("Invalid value for header '{}'", name))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
