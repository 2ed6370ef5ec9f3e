//! Stream transport
//!
//! Sends one request and drives the response body through a [`ChunkParser`]
//! under the watch of a [`LivenessMonitor`].

use super::liveness::{LivenessMonitor, LivenessState, Timeouts};
use crate::providers::{ChunkParser, FrameDecoder};
use crate::utils::error::{helpers, StreamError, StreamResult};
use bytes::Bytes;
use reqwest::RequestBuilder;
use std::fmt::Display;
use std::future::Future;
use tokio::time::MissedTickBehavior;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Transport for exactly one call
///
/// Parser state stays readable after the call ends so the caller can build
/// a partial payload from an error.
pub struct StreamTransport {
    parser: ChunkParser,
    monitor: LivenessMonitor,
    cancel: CancellationToken,
    received: u64,
}

impl StreamTransport {
    pub fn new(decoder: Box<dyn FrameDecoder>, timeouts: Timeouts, cancel: CancellationToken) -> Self {
        Self {
            parser: ChunkParser::new(decoder),
            monitor: LivenessMonitor::new(timeouts),
            cancel,
            received: 0,
        }
    }

    /// Send the request and stream the response body
    pub async fn send(
        &mut self,
        request: RequestBuilder,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> StreamResult<()> {
        let connect = async move {
            let response = request
                .send()
                .await
                .map_err(|e| helpers::transport_error(format!("Failed to send request: {}", e)))?;

            let status = response.status();
            debug!("Upstream responded with status {}", status);
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(StreamError::from_status(status.as_u16(), &error_text));
            }

            Ok::<_, StreamError>(response.bytes_stream())
        };

        self.drive(connect, on_chunk).await
    }

    /// Drive a connect future and the body stream it yields
    ///
    /// Dropping the in-flight future or stream is the abort.
    pub async fn drive<C, S, E>(
        &mut self,
        connect: C,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> StreamResult<()>
    where
        C: Future<Output = StreamResult<S>>,
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut ticker = tokio::time::interval(self.monitor.timeouts().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        tokio::pin!(connect);
        let body = loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => self.check_liveness()?,
                result = &mut connect => break result?,
            }
        };

        tokio::pin!(body);
        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => self.check_liveness()?,
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        trace!("Received {} bytes", bytes.len());
                        self.received += bytes.len() as u64;
                        self.parser.feed(&bytes, on_chunk);
                        if self.parser.detected_error().is_some() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(helpers::transport_error(format!(
                            "Failed to read streaming response chunk: {}",
                            e
                        )));
                    }
                    None => break,
                },
            }
        }

        self.parser.finish(on_chunk);
        self.monitor.complete();

        if let Some(message) = self.parser.detected_error() {
            return Err(StreamError::from_stream_message(message));
        }
        if self.parser.text().is_empty() && self.parser.malformed_frames() > 0 {
            return Err(helpers::protocol_error(format!(
                "No text decoded; {} malformed frame(s)",
                self.parser.malformed_frames()
            )));
        }

        Ok(())
    }

    fn check_liveness(&mut self) -> StreamResult<()> {
        let timeouts = *self.monitor.timeouts();
        match self.monitor.tick(self.received, self.cancel.is_cancelled()) {
            LivenessState::ConnectTimedOut => Err(StreamError::ConnectTimeout {
                timeout: timeouts.connect,
                partial: None,
            }),
            LivenessState::ReadTimedOut => Err(StreamError::ReadTimeout {
                timeout: timeouts.read,
                partial: None,
            }),
            LivenessState::Cancelled => Err(StreamError::Cancelled { partial: None }),
            LivenessState::Connecting | LivenessState::Receiving | LivenessState::Completed => Ok(()),
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        self.parser.text()
    }

    pub fn total_tokens(&self) -> u32 {
        self.parser.total_tokens()
    }

    /// Total bytes received from the body
    pub fn bytes_received(&self) -> u64 {
        self.received
    }

    pub fn state(&self) -> LivenessState {
        self.monitor.state()
    }

    pub fn abort_count(&self) -> u32 {
        self.monitor.abort_count()
    }
}
