//! Room DTOs - Data Transfer Objects per le stanze

use crate::entities::Room;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomDTO {
    pub room_id: i64,
    pub course_id: String,
    pub section_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for RoomDTO {
    fn from(value: Room) -> Self {
        Self {
            room_id: value.room_id,
            course_id: value.course_id,
            section_id: value.section_id,
            created_at: value.created_at,
        }
    }
}

/// DTO per la risoluzione idempotente di una stanza
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct EnsureRoomDTO {
    #[validate(length(min = 1, max = 64, message = "Course id must be between 1 and 64 characters"))]
    pub course_id: String,

    #[validate(length(min = 1, max = 64, message = "Section id must be between 1 and 64 characters"))]
    pub section_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomListDTO {
    pub rooms: Vec<RoomDTO>,
}
