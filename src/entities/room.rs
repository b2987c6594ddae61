//! Room entity - Entità stanza, una per coppia (corso, sezione)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Una stanza non viene mai cancellata: il ciclo di vita è create-once, read-many.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Room {
    pub room_id: i64,
    pub course_id: String,
    pub section_id: String,
    pub created_at: DateTime<Utc>,
}
