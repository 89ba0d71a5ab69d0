//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Response of `GET /api/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDto {
    pub active_users: u64,
}
