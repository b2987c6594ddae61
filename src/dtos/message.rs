//! Message DTOs - Data Transfer Objects per i messaggi

use crate::entities::{Message, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Rappresentazione di un messaggio verso il client.
///
/// Per i messaggi cancellati il body viene trattenuto qui, al confine:
/// ogni lettura successiva alla cancellazione rigioca il tombstone,
/// mai il testo originale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageDTO {
    pub message_id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_role: UserRole,
    pub sender_name: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        let body = if value.deleted {
            None
        } else {
            Some(value.body)
        };
        Self {
            message_id: value.message_id,
            room_id: value.room_id,
            sender_id: value.sender_id,
            sender_role: value.sender_role,
            sender_name: value.sender_name,
            body,
            created_at: value.created_at,
            deleted: value.deleted,
        }
    }
}

/// Body della richiesta di invio. Il mittente viene sempre dal token,
/// mai dal body.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(max = 5000, message = "Message body must be at most 5000 characters"))]
    pub body: String,
}

/// DTO interno per la creazione nel repository (id assegnato dal database)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateMessageDTO {
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_role: UserRole,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageListDTO {
    pub messages: Vec<MessageDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AckDTO {
    pub ok: bool,
}
