use serde::Deserialize;

pub mod auth;
pub mod cart;
pub mod config;
pub mod food;
pub mod order;

/// `GET /health/`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}
