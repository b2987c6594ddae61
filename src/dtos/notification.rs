//! Notification DTOs - Data Transfer Objects per il canale notifiche

use crate::entities::{Notification, NotificationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Payload tipizzato della notifica.
///
/// Insieme chiuso di varianti con schema fisso, serializzato come
/// { "type": "announcement", "data": { ... } } e validato qui, al confine
/// di trasporto: un payload che non rispetta lo schema della propria
/// variante degrada a `System`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum NotificationPayloadDTO {
    /// Riferimento all'annuncio che ha generato la notifica
    Announcement { announcement_id: i64 },
    System,
}

impl NotificationPayloadDTO {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayloadDTO::Announcement { .. } => NotificationKind::Announcement,
            NotificationPayloadDTO::System => NotificationKind::System,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationDTO {
    pub notification_id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub payload: NotificationPayloadDTO,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AnnouncementData {
    announcement_id: i64,
}

impl From<Notification> for NotificationDTO {
    fn from(value: Notification) -> Self {
        let payload = match value.kind {
            NotificationKind::Announcement => value
                .data
                .as_deref()
                .and_then(|raw| serde_json::from_str::<AnnouncementData>(raw).ok())
                .map(|d| NotificationPayloadDTO::Announcement {
                    announcement_id: d.announcement_id,
                })
                .unwrap_or_else(|| {
                    warn!(
                        notification_id = value.notification_id,
                        "Announcement notification with malformed payload, degrading to system"
                    );
                    NotificationPayloadDTO::System
                }),
            NotificationKind::System => NotificationPayloadDTO::System,
        };

        Self {
            notification_id: value.notification_id,
            user_id: value.user_id,
            payload,
            message: value.message,
            read: value.read,
            created_at: value.created_at,
        }
    }
}

/// DTO interno per la creazione nel repository
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateNotificationDTO {
    pub user_id: i64,
    pub payload: NotificationPayloadDTO,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationListDTO {
    pub notifications: Vec<NotificationDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UnreadCountDTO {
    pub unread: i64,
}
