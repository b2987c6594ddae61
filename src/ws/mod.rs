//! WebSocket Module - Gateway real-time del sottosistema chat
//!
//! Gestisce le connessioni persistenti verso i client. Ciclo di vita di
//! una connessione: Connecting -> Authenticated -> Subscribed -> Closed.
//! L'autenticazione avviene una sola volta all'handshake (middleware
//! bearer sulla route /ws, fallimento = connessione rifiutata prima
//! dell'upgrade); da autenticata la connessione può unirsi e lasciare un
//! numero arbitrario di stanze.
//!
//! Il gateway non persiste nulla: rilancia soltanto eventi derivati dalle
//! scritture sul log, con consegna best-effort (at-most-once) per
//! connessione. La finestra persa durante una disconnessione è coperta dal
//! re-fetch della storia lato client.

pub mod connection;
pub mod roommap;

// Re-exports pubblici
pub use connection::handle_socket;
pub use roommap::RoomMap;

use crate::core::AuthUser;
use crate::AppState;
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Capacità del canale broadcast per stanza: i receiver in ritardo oltre
/// questa soglia perdono eventi (recuperati poi via storia)
pub const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// Intervallo minimo tra eventi inbound di una stessa connessione
pub const RATE_LIMITER_MILLIS: u64 = 50;

/// Entry point per le richieste di upgrade WebSocket.
/// L'utente arriva già autenticato dal middleware sulla route.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, current_user))
}
