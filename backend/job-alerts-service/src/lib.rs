pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod triggers;

pub use config::Config;
pub use context::AppContext;
pub use error::{AppError, Result};
pub use services::*;
pub use triggers::{EventKind, TriggerEvent, TriggerRegistry};
