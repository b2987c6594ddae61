//! Notification entity - Entità notifica per il canale di polling

use super::enums::NotificationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    /// Payload serializzato, validato al confine di trasporto (vedi dtos)
    pub data: Option<String>,
    pub created_at: DateTime<Utc>,
}
