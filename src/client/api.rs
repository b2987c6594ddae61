//! ApiClient - Richieste REST verso il backend chat/notifiche

use crate::client::error::ClientError;
use crate::client::notifier::NotificationFeed;
use crate::dtos::{
    AckDTO, EnsureRoomDTO, MessageDTO, MessageListDTO, NotificationDTO, NotificationListDTO,
    RoomDTO, RoomListDTO, SendMessageDTO, UnreadCountDTO,
};
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Sorgente della storia recente di una stanza.
///
/// Il multiplexer la usa per riconciliare la finestra di broadcast persa
/// durante una disconnessione; nei test viene sostituita da un finto
/// archivio in memoria.
pub trait HistorySource: Send + Sync + 'static {
    fn recent(
        &self,
        room_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<MessageDTO>, ClientError>> + Send;
}

/// Client HTTP con bearer token di sessione.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Mappa lo status HTTP nella tassonomia degli errori client.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Auth(detail),
            StatusCode::FORBIDDEN => ClientError::Permission(detail),
            StatusCode::NOT_FOUND => ClientError::NotFound(detail),
            StatusCode::BAD_REQUEST => ClientError::Validation(detail),
            other => ClientError::Transport(format!("unexpected status {other}: {detail}")),
        })
    }

    /// Risoluzione idempotente della stanza di una coppia corso/sezione
    #[instrument(skip(self))]
    pub async fn ensure_room(
        &self,
        course_id: &str,
        section_id: &str,
    ) -> Result<RoomDTO, ClientError> {
        let response = self
            .http
            .post(self.url("/chat/room"))
            .bearer_auth(&self.token)
            .json(&EnsureRoomDTO {
                course_id: course_id.to_string(),
                section_id: section_id.to_string(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    pub async fn list_rooms(&self) -> Result<Vec<RoomDTO>, ClientError> {
        let response = self
            .http
            .get(self.url("/chat/rooms"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let list: RoomListDTO = Self::decode(response).await?;
        Ok(list.rooms)
    }

    /// Pagina di storia all'indietro: messaggi con created_at < before
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        room_id: i64,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<MessageDTO>, ClientError> {
        let mut request = self
            .http
            .get(self.url(&format!("/chat/rooms/{room_id}/messages")))
            .bearer_auth(&self.token)
            .query(&[("limit", limit)]);
        if let Some(before) = before {
            request = request.query(&[("before", before.to_rfc3339())]);
        }

        let response = request.send().await?;
        let list: MessageListDTO = Self::decode(response).await?;
        Ok(list.messages)
    }

    /// Invia un messaggio. La risposta è solo l'ack di persistenza:
    /// la visibilità arriva con il broadcast, non con questa risposta.
    #[instrument(skip(self, body))]
    pub async fn send_message(&self, room_id: i64, body: &str) -> Result<MessageDTO, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/chat/rooms/{room_id}/messages")))
            .bearer_auth(&self.token)
            .json(&SendMessageDTO {
                body: body.to_string(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    pub async fn delete_message(&self, message_id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/chat/messages/{message_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let _: AckDTO = Self::decode(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self) -> Result<u64, ClientError> {
        let response = self
            .http
            .get(self.url("/notifications/unread-count"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let count: UnreadCountDTO = Self::decode(response).await?;
        Ok(count.unread.max(0) as u64)
    }

    #[instrument(skip(self))]
    pub async fn notifications(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<Vec<NotificationDTO>, ClientError> {
        let response = self
            .http
            .get(self.url("/notifications"))
            .bearer_auth(&self.token)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;
        let list: NotificationListDTO = Self::decode(response).await?;
        Ok(list.notifications)
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .patch(self.url("/notifications/mark-all/read"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let _: AckDTO = Self::decode(response).await?;
        Ok(())
    }
}

impl HistorySource for ApiClient {
    async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<MessageDTO>, ClientError> {
        debug!(room_id, "Fetching recent history page");
        self.list_messages(room_id, None, limit).await
    }
}

impl NotificationFeed for ApiClient {
    async fn unread_count(&self) -> Result<u64, ClientError> {
        ApiClient::unread_count(self).await
    }

    async fn notifications(&self, page: i64, limit: i64) -> Result<Vec<NotificationDTO>, ClientError> {
        ApiClient::notifications(self, page, limit).await
    }

    async fn mark_all_read(&self) -> Result<(), ClientError> {
        ApiClient::mark_all_read(self).await
    }
}
