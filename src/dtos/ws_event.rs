//! WebSocket Event DTOs - Eventi tipizzati sul canale real-time
//!
//! Entrambe le direzioni usano tagged union con schema fisso per variante:
//! { "type": "message_new", "data": { ... } }
//! I frame che non rispettano lo schema vengono scartati al confine.

use crate::dtos::MessageDTO;
use serde::{Deserialize, Serialize};

/// Eventi server -> client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsEventDTO {
    /// Un messaggio è stato accettato dal log ed è ora visibile
    MessageNew(MessageDTO),
    /// Un messaggio è diventato tombstone. room_id permette al client
    /// multiplexato di instradare l'evento alla superficie giusta.
    MessageDeleted { message_id: i64, room_id: i64 },
    Error { code: u16, message: String },
}

/// Eventi client -> server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEventDTO {
    JoinRoom { room_id: i64 },
    LeaveRoom { room_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_wire_format() {
        let event = ClientEventDTO::JoinRoom { room_id: 7 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"join_room","data":{"room_id":7}}"#);
    }

    #[test]
    fn message_deleted_wire_format() {
        let event = WsEventDTO::MessageDeleted {
            message_id: 42,
            room_id: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: WsEventDTO = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let raw = r#"{"type":"shutdown_everything","data":{}}"#;
        assert!(serde_json::from_str::<ClientEventDTO>(raw).is_err());
    }
}
