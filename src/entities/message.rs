//! Message entity - Entità messaggio

use super::enums::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_role: UserRole,
    pub sender_name: String,
    pub body: String,
    // stringa iso8601 parsata in DateTime UTC, conversione automatica via serde/sqlx
    pub created_at: DateTime<Utc>,
    // tombstone monotono: una volta true non torna mai false
    pub deleted: bool,
}
