//! Message services - Invio, listato e cancellazione dei messaggi

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{
    AckDTO, CreateMessageDTO, MessageDTO, MessageListDTO, MessagesQuery, SendMessageDTO,
    WsEventDTO,
};
use crate::repositories::{Create, Read};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use axum_macros::debug_handler;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Dimensione pagina di default e massima per il listato messaggi
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[instrument(skip(state, current_user), fields(room_id = %room_id, user_id = %current_user.user_id))]
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(params): Query<MessagesQuery>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<MessageListDTO>, AppError> {
    debug!("Fetching room messages");

    let room = state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    if !state
        .access
        .can_access(&current_user, &room.course_id, &room.section_id)
    {
        warn!("Access denied for room");
        return Err(AppError::not_found("Room not found"));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let messages = state
        .msg
        .find_many_paginated(&room_id, params.before.as_ref(), limit)
        .await?;

    info!("Retrieved {} messages for room", messages.len());

    let messages: Vec<MessageDTO> = messages.into_iter().map(MessageDTO::from).collect();
    Ok(Json(MessageListDTO { messages }))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(room_id = %room_id, user_id = %current_user.user_id))]
pub async fn post_room_message(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<SendMessageDTO>,
) -> Result<Json<MessageDTO>, AppError> {
    debug!("Appending message to room");
    body.validate()?;

    let trimmed = body.body.trim();
    if trimmed.is_empty() {
        warn!("Rejected message with empty body");
        return Err(AppError::bad_request("Message body cannot be empty"));
    }

    let room = state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    if !state
        .access
        .can_access(&current_user, &room.course_id, &room.section_id)
    {
        warn!("Access denied for room");
        return Err(AppError::not_found("Room not found"));
    }

    let created = state
        .msg
        .create(&CreateMessageDTO {
            room_id,
            sender_id: current_user.user_id,
            sender_role: current_user.role,
            sender_name: current_user.name.clone(),
            body: trimmed.to_string(),
            created_at: Utc::now(),
        })
        .await?;

    info!(message_id = created.message_id, "Message appended");

    let dto = MessageDTO::from(created);

    // La scrittura sul log è già conclusa: la consegna ai sottoscrittori è
    // best-effort e non condiziona la risposta al mittente.
    let _ = state
        .rooms_live
        .send(&room_id, Arc::new(WsEventDTO::MessageNew(dto.clone())));

    Ok(Json(dto))
}

#[instrument(skip(state, current_user), fields(message_id = %message_id, user_id = %current_user.user_id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<AckDTO>, AppError> {
    debug!("Soft deleting message");

    if !current_user.role.can_delete_messages() {
        warn!(role = ?current_user.role, "Role not allowed to delete messages");
        return Err(AppError::forbidden("Insufficient role to delete messages"));
    }

    let (message, transitioned) = state.msg.soft_delete(&message_id).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::not_found("Message not found"),
        other => AppError::from(other),
    })?;

    if transitioned {
        info!(room_id = message.room_id, "Message tombstoned, broadcasting");
        let _ = state.rooms_live.send(
            &message.room_id,
            Arc::new(WsEventDTO::MessageDeleted {
                message_id,
                room_id: message.room_id,
            }),
        );
    } else {
        // già tombstone: successo idempotente, nessun nuovo broadcast
        debug!("Message was already deleted");
    }

    Ok(Json(AckDTO { ok: true }))
}
