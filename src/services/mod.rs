//! Service layer module
//!
//! Contains the liveness monitor, stream transport, Player2 authentication
//! and the provider router

pub mod auth;
pub mod liveness;
pub mod router;
pub mod transport;

pub use auth::{AuthResolver, Clock, HttpLocalApp, LocalApp, ResolvedConnection, SystemClock};
pub use liveness::{is_local_endpoint, LivenessMonitor, LivenessState, Timeouts};
pub use router::StreamingClient;
pub use transport::StreamTransport;
