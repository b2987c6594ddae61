//! RoomRepository - Repository per la directory delle stanze

use super::Read;
use crate::entities::Room;
use chrono::Utc;
use sqlx::{Error, SqlitePool};

// ROOM REPO
pub struct RoomRepository {
    connection_pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Upsert idempotente sulla coppia (corso, sezione).
    ///
    /// Il vincolo UNIQUE garantisce al massimo una riga per coppia anche
    /// sotto chiamate concorrenti: l'INSERT di chi perde la corsa non fa
    /// nulla e tutti convergono sulla stessa stanza con la SELECT.
    pub async fn ensure(&self, course_id: &str, section_id: &str) -> Result<Room, Error> {
        sqlx::query(
            r#"
            INSERT INTO rooms (course_id, section_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (course_id, section_id) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(section_id)
        .bind(Utc::now())
        .execute(&self.connection_pool)
        .await?;

        sqlx::query_as::<_, Room>(
            r#"
            SELECT room_id, course_id, section_id, created_at
            FROM rooms
            WHERE course_id = ? AND section_id = ?
            "#,
        )
        .bind(course_id)
        .bind(section_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Tutte le stanze esistenti, in ordine stabile
    pub async fn find_all(&self) -> Result<Vec<Room>, Error> {
        sqlx::query_as::<_, Room>(
            r#"
            SELECT room_id, course_id, section_id, created_at
            FROM rooms
            ORDER BY course_id ASC, section_id ASC
            "#,
        )
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<Room, i64> for RoomRepository {
    async fn read(&self, id: &i64) -> Result<Option<Room>, Error> {
        sqlx::query_as::<_, Room>(
            r#"
            SELECT room_id, course_id, section_id, created_at
            FROM rooms
            WHERE room_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
