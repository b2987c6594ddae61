use crate::dtos::WsEventDTO;
use crate::ws::BROADCAST_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::SendError;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{info, instrument, warn};

/// Mappa concorrente stanza -> canale broadcast.
///
/// Un canale esiste solo finché la stanza ha almeno un sottoscrittore:
/// l'ordine per stanza è garantito dal canale, nessun ordine globale
/// tra stanze.
pub struct RoomMap {
    channels: DashMap<i64, Sender<Arc<WsEventDTO>>>,
}

impl RoomMap {
    pub fn new() -> Self {
        RoomMap {
            channels: DashMap::new(),
        }
    }

    #[instrument(skip(self), fields(room_id))]
    pub fn subscribe(&self, room_id: &i64) -> Receiver<Arc<WsEventDTO>> {
        match self.channels.get(room_id) {
            // prima sottoscrizione: il canale viene creato qui
            None => {
                info!("Creating new broadcast channel for room");
                // Arc<WsEventDTO> per condividere il riferimento, non l'evento
                let (tx, rx) = broadcast::channel::<Arc<WsEventDTO>>(BROADCAST_CHANNEL_CAPACITY);
                self.channels.insert(*room_id, tx);
                rx
            }
            Some(c) => {
                info!("Subscribing to existing broadcast channel");
                c.value().subscribe()
            }
        }
    }

    /// Consegna best-effort: ritorna il numero di receiver raggiunti.
    /// Nessun sottoscrittore non è un errore per il chiamante: la
    /// scrittura sul log resta valida.
    #[instrument(skip(self, event), fields(room_id))]
    pub fn send(
        &self,
        room_id: &i64,
        event: Arc<WsEventDTO>,
    ) -> Result<usize, SendError<Arc<WsEventDTO>>> {
        if let Some(room) = self.channels.get(room_id) {
            match room.send(event.clone()) {
                Ok(n) => {
                    info!(receivers = n, "Event broadcast to receivers");
                    Ok(n)
                }
                Err(e) => {
                    warn!("No active receivers, removing channel");
                    drop(room); // rilascia il lock prima della remove
                    self.channels.remove(room_id);
                    Err(e)
                }
            }
        } else {
            warn!("Attempted to send to room without subscribers");
            Err(SendError(event))
        }
    }

    /// Numero di stanze con un canale attivo
    #[allow(dead_code)]
    pub fn live_count(&self) -> usize {
        self.channels.len()
    }

    /// Verifica se una stanza ha un canale attivo
    #[allow(dead_code)]
    pub fn is_live(&self, room_id: &i64) -> bool {
        self.channels.contains_key(room_id)
    }
}
