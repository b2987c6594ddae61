//! Notification services - Superficie di polling per le notifiche

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{
    AckDTO, NotificationDTO, NotificationListDTO, NotificationsQuery, UnreadCountDTO,
};
use axum::{
    Extension,
    extract::{Json, Query, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<UnreadCountDTO>, AppError> {
    let unread = state.notification.unread_count(&current_user.user_id).await?;
    debug!(unread, "Unread count fetched");
    Ok(Json(UnreadCountDTO { unread }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationsQuery>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<NotificationListDTO>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let notifications: Vec<NotificationDTO> = state
        .notification
        .find_many_paginated(&current_user.user_id, page, limit)
        .await?
        .into_iter()
        .map(NotificationDTO::from)
        .collect();

    info!("Retrieved {} notifications", notifications.len());
    Ok(Json(NotificationListDTO { notifications }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<AckDTO>, AppError> {
    let marked = state.notification.mark_all_read(&current_user.user_id).await?;
    info!(marked, "Notifications marked as read");
    Ok(Json(AckDTO { ok: true }))
}
