pub mod app;
pub mod orders;

pub use app::{AppState, broker_producer, build_router};
