use crate::pipeline::TickMetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    pub currencies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ticks: TickMetricsSnapshot,
}
