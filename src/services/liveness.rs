//! Liveness monitoring
//!
//! Tracks transfer progress of one in-flight call. The transport reports the
//! running byte count once per poll interval; the monitor decides whether the
//! call is still healthy.

use crate::config::{ProviderConfig, Settings};
use reqwest::Url;
use std::net::IpAddr;
use std::time::Duration;

/// Lifecycle of one monitored call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// Request sent, no byte received yet
    Connecting,
    /// At least one byte received
    Receiving,
    Completed,
    ConnectTimedOut,
    ReadTimedOut,
    Cancelled,
}

impl LivenessState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LivenessState::Connecting | LivenessState::Receiving)
    }
}

/// Timeouts applied to one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum wait for the first byte
    pub connect: Duration,
    /// Maximum stall once bytes are flowing
    pub read: Duration,
    /// Progress poll interval
    pub poll_interval: Duration,
}

impl Timeouts {
    pub fn new(connect: Duration, read: Duration, poll_interval: Duration) -> Self {
        Self { connect, read, poll_interval }
    }

    /// Resolve the timeouts for a request URL
    ///
    /// Local servers get the longer connect timeout since they may need to
    /// load a model before the first token. Provider overrides win.
    pub fn for_endpoint(url: &str, settings: &Settings, config: &ProviderConfig) -> Self {
        let t = &settings.timeouts;
        let default_connect = if is_local_endpoint(url) {
            t.local_connect_secs
        } else {
            t.connect_secs
        };

        Self {
            connect: Duration::from_secs(config.connect_timeout_secs.unwrap_or(default_connect)),
            read: Duration::from_secs(config.read_timeout_secs.unwrap_or(t.read_secs)),
            poll_interval: settings.poll_interval(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(60), Duration::from_millis(100))
    }
}

/// Whether the URL points at this machine or a private network
pub fn is_local_endpoint(url: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => ip.is_loopback() || ip.is_private(),
        Ok(IpAddr::V6(ip)) => ip.is_loopback(),
        Err(_) => false,
    }
}

/// Progress watchdog for one call
///
/// Terminal states are sticky and the abort is recorded exactly once.
#[derive(Debug)]
pub struct LivenessMonitor {
    timeouts: Timeouts,
    state: LivenessState,
    last_observed: u64,
    inactivity: Duration,
    aborts: u32,
}

impl LivenessMonitor {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            state: LivenessState::Connecting,
            last_observed: 0,
            inactivity: Duration::ZERO,
            aborts: 0,
        }
    }

    /// Advance one poll interval
    ///
    /// `observed` is the total number of bytes received so far. Cancellation
    /// is checked before progress.
    pub fn tick(&mut self, observed: u64, cancelled: bool) -> LivenessState {
        if self.state.is_terminal() {
            return self.state;
        }
        if cancelled {
            return self.abort(LivenessState::Cancelled);
        }

        if observed > self.last_observed {
            self.last_observed = observed;
            self.inactivity = Duration::ZERO;
            self.state = LivenessState::Receiving;
            return self.state;
        }

        self.inactivity += self.timeouts.poll_interval;
        match self.state {
            LivenessState::Connecting if self.inactivity >= self.timeouts.connect => {
                self.abort(LivenessState::ConnectTimedOut)
            }
            LivenessState::Receiving if self.inactivity >= self.timeouts.read => {
                self.abort(LivenessState::ReadTimedOut)
            }
            state => state,
        }
    }

    /// Mark the body as fully received; no effect once terminal
    pub fn complete(&mut self) -> LivenessState {
        if !self.state.is_terminal() {
            self.state = LivenessState::Completed;
        }
        self.state
    }

    fn abort(&mut self, state: LivenessState) -> LivenessState {
        self.aborts += 1;
        self.state = state;
        state
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn inactivity(&self) -> Duration {
        self.inactivity
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Number of times the call was aborted (0 or 1)
    pub fn abort_count(&self) -> u32 {
        self.aborts
    }
}
