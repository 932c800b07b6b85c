use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str, // "ok" ou "unreachable"
    pub time: DateTime<Utc>,
}
