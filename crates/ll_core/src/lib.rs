pub mod app_error;
pub mod canonical;
pub mod config;
pub mod db;
pub mod game;
pub mod heatmap;
pub mod job_steps;
pub mod progress_store;
pub mod provisioning;
pub mod puzzle;
pub mod server_store;
pub mod sync;
pub mod sync_endpoint;
pub mod sync_transport;
pub mod sync_trigger;
pub mod telemetry;
pub mod types;

pub use app_error::{AppError, AppResult};
pub use types::{DateKey, Identity};
