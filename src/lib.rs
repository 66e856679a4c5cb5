//! Show an object, then ask about it.
//!
//! A client uploads a photo to `POST /detect`; a hosted vision model names the
//! main object and the service remembers it (label and image) under a session
//! key. Questions sent to `POST /object_qa` are answered by the same model,
//! with the stored image re-sent for grounding.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod session;
pub mod telemetry;

pub use api::{build_router, AppState};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use model::{ImageData, ModelError, OpenAiVisionClient, VisionModel};
pub use session::{FollowUpPolicy, SessionKeyStrategy, SessionStore};
