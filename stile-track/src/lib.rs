//! Tracking-feature extraction.
//!
//! Raw client signals (headers, cookies, query, peer address) are first
//! collected into a typed [`TrackingSignals`] and then normalized into a
//! [`stile_core::TrackingProfile`] by the pure, total [`parse`] function.

pub mod client_ip;
pub mod extract;
pub mod geo;
pub mod signals;
pub mod webrtc;

pub use extract::parse;
pub use signals::{DEFAULT_SESSION_COOKIES, SignalSource, TrackingSignals};
