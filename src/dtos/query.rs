//! Query DTOs - Data Transfer Objects per i query parameter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paginazione all'indietro dei messaggi: solo quelli con created_at < before
#[derive(Serialize, Deserialize, Debug)]
pub struct MessagesQuery {
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}
