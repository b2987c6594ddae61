//! Services module - Handler HTTP organizzati per area funzionale

pub mod message;
pub mod notification;
pub mod room;

pub use message::{delete_message, get_room_messages, post_room_message};
pub use notification::{get_unread_count, list_notifications, mark_all_read};
pub use room::{ensure_room, list_rooms};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
