//! MessageRepository - Repository per il log dei messaggi
//!
//! Il log è append-only: la cancellazione è un tombstone monotono,
//! mai una DELETE fisica.

use super::{Create, Read};
use crate::dtos::CreateMessageDTO;
use crate::entities::Message;
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

const SELECT_COLUMNS: &str =
    "message_id, room_id, sender_id, sender_role, sender_name, body, created_at, deleted";

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Pagina di messaggi di una stanza, ordinata per (created_at, message_id)
    /// crescente.
    ///
    /// Con `before` ritorna i `limit` messaggi più recenti strettamente
    /// precedenti a quella data; senza, i `limit` più recenti in assoluto.
    /// I tombstone sono inclusi: è il DTO a trattenerne il body.
    pub async fn find_many_paginated(
        &self,
        room_id: &i64,
        before: Option<&DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        let mut messages = if let Some(before) = before {
            sqlx::query_as::<_, Message>(&format!(
                r#"
                SELECT {SELECT_COLUMNS}
                FROM messages
                WHERE room_id = ? AND created_at < ?
                ORDER BY created_at DESC, message_id DESC
                LIMIT ?
                "#
            ))
            .bind(room_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        } else {
            sqlx::query_as::<_, Message>(&format!(
                r#"
                SELECT {SELECT_COLUMNS}
                FROM messages
                WHERE room_id = ?
                ORDER BY created_at DESC, message_id DESC
                LIMIT ?
                "#
            ))
            .bind(room_id)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        };

        // la query estrae i più recenti, il chiamante li vuole crescenti
        messages.reverse();
        Ok(messages)
    }

    /// Marca un messaggio come cancellato.
    ///
    /// Ritorna il messaggio e `true` se questa chiamata ha effettuato la
    /// transizione false -> true; `false` se era già tombstone (no-op).
    /// `RowNotFound` per id inesistente.
    pub async fn soft_delete(&self, message_id: &i64) -> Result<(Message, bool), Error> {
        let result = sqlx::query("UPDATE messages SET deleted = 1 WHERE message_id = ? AND deleted = 0")
            .bind(message_id)
            .execute(&self.connection_pool)
            .await?;

        let transitioned = result.rows_affected() > 0;

        let message = self
            .read(message_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok((message, transitioned))
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (room_id, sender_id, sender_role, sender_name, body, created_at, deleted)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(data.room_id)
        .bind(data.sender_id)
        .bind(data.sender_role)
        .bind(&data.sender_name)
        .bind(&data.body)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_rowid();

        Ok(Message {
            message_id: new_id,
            room_id: data.room_id,
            sender_id: data.sender_id,
            sender_role: data.sender_role,
            sender_name: data.sender_name.clone(),
            body: data.body.clone(),
            created_at: data.created_at,
            deleted: false,
        })
    }
}

impl Read<Message, i64> for MessageRepository {
    async fn read(&self, id: &i64) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM messages
            WHERE message_id = ?
            "#
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
