//! Aula chat library - espone i moduli principali per i test

pub mod client;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use crate::services::root;

use axum::{Router, middleware, routing::{any, delete, get, patch, post}};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::core::authentication_middleware;
    use crate::ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/chat", configure_chat_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .with_state(state)
}

/// Configura le routes per stanze e messaggi
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::*;

    Router::new()
        .route("/room", post(ensure_room))
        .route("/rooms", get(list_rooms))
        .route(
            "/rooms/{room_id}/messages",
            get(get_room_messages).post(post_room_message),
        )
        .route("/messages/{message_id}", delete(delete_message))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per il canale notifiche (polling)
fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::*;

    Router::new()
        .route("/unread-count", get(get_unread_count))
        .route("/", get(list_notifications))
        .route("/mark-all/read", patch(mark_all_read))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
