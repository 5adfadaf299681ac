//! HTTP API handlers

pub mod download;
pub mod health;
pub mod recordings;

pub use download::download_routes;
pub use health::health_routes;
pub use recordings::recordings_routes;
