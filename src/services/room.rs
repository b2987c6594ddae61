//! Room services - Risoluzione e listato delle stanze

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{EnsureRoomDTO, RoomDTO, RoomListDTO};
use axum::{
    Extension,
    extract::{Json, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn ensure_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<EnsureRoomDTO>,
) -> Result<Json<RoomDTO>, AppError> {
    debug!("Resolving room for course section");
    body.validate()?;

    // L'accesso è delegato alla policy esterna. Chi non può vedere la
    // coppia riceve NOT_FOUND, senza distinguere "non esiste" da
    // "non autorizzato".
    if !state
        .access
        .can_access(&current_user, &body.course_id, &body.section_id)
    {
        warn!(
            course_id = %body.course_id,
            section_id = %body.section_id,
            "Access denied for course section"
        );
        return Err(AppError::not_found("Course section not found"));
    }

    let room = state.room.ensure(&body.course_id, &body.section_id).await?;

    info!(room_id = room.room_id, "Room resolved");
    Ok(Json(RoomDTO::from(room)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<RoomListDTO>, AppError> {
    debug!("Listing rooms for user");

    let rooms: Vec<RoomDTO> = state
        .room
        .find_all()
        .await?
        .into_iter()
        .filter(|r| {
            state
                .access
                .can_access(&current_user, &r.course_id, &r.section_id)
        })
        .map(RoomDTO::from)
        .collect();

    info!("Successfully retrieved {} rooms", rooms.len());
    Ok(Json(RoomListDTO { rooms }))
}
