//! Application State - Stato globale dell'applicazione
//!
//! Contiene i repository, la mappa delle stanze attive e le dipendenze
//! condivise tra route e middleware.

use crate::core::access::AccessPolicy;
use crate::repositories::{MessageRepository, NotificationRepository, RoomRepository};
use crate::ws::roommap::RoomMap;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct AppState {
    /// Repository per la gestione delle stanze
    pub room: RoomRepository,

    /// Repository per la gestione dei messaggi (unico scrittore di verità)
    pub msg: MessageRepository,

    /// Repository per la gestione delle notifiche
    pub notification: NotificationRepository,

    /// Secret key per i token JWT
    pub jwt_secret: String,

    /// Canali broadcast delle stanze con almeno un sottoscrittore.
    /// Il gateway non persiste nulla: qui vive solo stato transiente.
    pub rooms_live: RoomMap,

    /// Controlli di accesso corso/sezione (collaboratore esterno)
    pub access: Arc<dyn AccessPolicy>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: String, access: Arc<dyn AccessPolicy>) -> Self {
        Self {
            room: RoomRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool),
            jwt_secret,
            rooms_live: RoomMap::new(),
            access,
        }
    }
}
