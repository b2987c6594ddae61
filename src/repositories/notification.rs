//! NotificationRepository - Repository per il canale notifiche

use super::Create;
use crate::dtos::CreateNotificationDTO;
use crate::entities::Notification;
use sqlx::{Error, SqlitePool};

// NOTIFICATION REPO
pub struct NotificationRepository {
    connection_pool: SqlitePool,
}

const SELECT_COLUMNS: &str =
    "notification_id, user_id, kind, message, read, data, created_at";

impl NotificationRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Numero di notifiche non lette per l'utente
    pub async fn unread_count(&self, user_id: &i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Pagina di notifiche dell'utente, le più recenti per prime
    pub async fn find_many_paginated(
        &self,
        user_id: &i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, Error> {
        let offset = (page.max(1) - 1) * limit;
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, notification_id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Marcatura bulk read=true, monotona e idempotente.
    /// Ritorna quante notifiche sono state effettivamente marcate.
    pub async fn mark_all_read(&self, user_id: &i64) -> Result<u64, Error> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
                .bind(user_id)
                .execute(&self.connection_pool)
                .await?;

        Ok(result.rows_affected())
    }
}

impl Create<Notification, CreateNotificationDTO> for NotificationRepository {
    async fn create(&self, data: &CreateNotificationDTO) -> Result<Notification, Error> {
        let kind = data.payload.kind();
        let raw_data = match serde_json::to_value(&data.payload) {
            // viene persistito solo il campo "data" della tagged union
            Ok(serde_json::Value::Object(map)) => map
                .get("data")
                .map(|v| v.to_string()),
            _ => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, read, data, created_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(data.user_id)
        .bind(kind)
        .bind(&data.message)
        .bind(&raw_data)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        Ok(Notification {
            notification_id: result.last_insert_rowid(),
            user_id: data.user_id,
            kind,
            message: data.message.clone(),
            read: false,
            data: raw_data,
            created_at: data.created_at,
        })
    }
}
