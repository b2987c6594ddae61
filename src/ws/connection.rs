//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::core::AuthUser;
use crate::dtos::{ClientEventDTO, WsEventDTO};
use crate::repositories::Read;
use crate::ws::RATE_LIMITER_MILLIS;
use crate::AppState;
use axum::extract::ws::Utf8Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, interval};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, instrument, warn};

/// Segnali interni dal task di lettura a quello di scrittura
pub enum InternalSignal {
    Shutdown,
    Join(i64),
    Leave(i64),
    Error(&'static str),
}

#[instrument(skip(ws, state, user), fields(user_id = %user.user_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user: AuthUser) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale unbounded per non perdere segnali tra i due task
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    // task in ascolto degli eventi del client (join/leave)
    tokio::spawn(listen_ws(user, ws_rx, int_tx, state.clone()));

    // task che inoltra i broadcast delle stanze sottoscritte
    tokio::spawn(write_ws(ws_tx, int_rx, state));
}

#[instrument(skip(websocket_tx, internal_rx, state))]
pub async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Write task started");

    // Nessuna sottoscrizione implicita: ogni stanza entra nella mappa
    // solo con un join esplicito del client.
    let mut stream_map: StreamMap<i64, BroadcastStream<Arc<WsEventDTO>>> = StreamMap::new();

    'external: loop {
        tokio::select! {
            Some((_, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                // Err(Lagged) = receiver troppo indietro: eventi persi,
                // il client li recupera con il re-fetch della storia
                if let Ok(event) = result {
                    if send_event(&mut websocket_tx, &event).await.is_err() {
                        warn!("Failed to send event, closing connection");
                        break 'external;
                    }
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::Join(room_id)) => {
                        info!(room_id, "Adding room subscription");
                        let rx = state.rooms_live.subscribe(&room_id);
                        stream_map.insert(room_id, BroadcastStream::new(rx));
                    }
                    Some(InternalSignal::Leave(room_id)) => {
                        info!(room_id, "Removing room subscription");
                        stream_map.remove(&room_id);
                    }
                    Some(InternalSignal::Error(err_msg)) => {
                        warn!(error_message = err_msg, "Sending error event to client");
                        let event = WsEventDTO::Error {
                            code: 404,
                            message: err_msg.to_string(),
                        };
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            error!("Failed to send error event");
                            break 'external;
                        }
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external; // listener terminato, stacca tutto
                    }
                }
            }
        }
    }

    info!("Write task terminated");
}

#[instrument(skip(websocket_tx, event))]
async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &WsEventDTO,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip(user, websocket_rx, internal_tx, state), fields(user_id = %user.user_id))]
pub async fn listen_ws(
    user: AuthUser,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Listen task started");

    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));

    while let Some(msg_result) = StreamExt::next(&mut websocket_rx).await {
        rate_limiter.tick().await;

        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Ok(event) = serde_json::from_str::<ClientEventDTO>(&text) {
                    process_client_event(&state, &user, event, &internal_tx).await;
                } else {
                    warn!("Failed to deserialize client event");
                }
            }
            Message::Close(_) => {
                info!("Close message received");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: la disconnessione vale come leave implicito da tutte le stanze
    info!("Cleaning up connection");
    let _ = internal_tx.send(InternalSignal::Shutdown);
    info!("Listen task terminated");
}

/// Valida e applica un evento del client.
/// Operazioni per il join:
/// 1. La stanza deve esistere
/// 2. La policy di accesso deve permettere la coppia corso/sezione
/// 3. Solo allora il task di scrittura viene sottoscritto al canale
#[instrument(skip(state, user, internal_tx), fields(user_id = %user.user_id))]
pub async fn process_client_event(
    state: &Arc<AppState>,
    user: &AuthUser,
    event: ClientEventDTO,
    internal_tx: &UnboundedSender<InternalSignal>,
) {
    match event {
        ClientEventDTO::JoinRoom { room_id } => {
            let room = match state.room.read(&room_id).await {
                Ok(Some(room)) => room,
                Ok(None) => {
                    warn!(room_id, "Join requested for unknown room");
                    let _ = internal_tx.send(InternalSignal::Error("Room not found"));
                    return;
                }
                Err(e) => {
                    error!(room_id, "Failed to load room: {:?}", e);
                    let _ = internal_tx.send(InternalSignal::Error("Room not found"));
                    return;
                }
            };

            if !state
                .access
                .can_access(user, &room.course_id, &room.section_id)
            {
                warn!(room_id, "Join denied by access policy");
                let _ = internal_tx.send(InternalSignal::Error("Room not found"));
                return;
            }

            info!(room_id, "Join accepted");
            let _ = internal_tx.send(InternalSignal::Join(room_id));
        }
        ClientEventDTO::LeaveRoom { room_id } => {
            info!(room_id, "Leave requested");
            let _ = internal_tx.send(InternalSignal::Leave(room_id));
        }
    }
}
