pub mod config;
pub mod error;
pub mod latency;
pub mod profile;
pub mod record;

pub use config::StileConfig;
pub use error::StileError;
pub use profile::{GeoLocation, TrackingProfile};
pub use record::{AccessRecord, Request, Response};
