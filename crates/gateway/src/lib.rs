pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod upload;

pub use error::DetectError;
pub use routes::{DetectionResponse, router};
pub use state::{AppState, DetectSettings};
