//! DTOs module - Data Transfer Objects scambiati con i client

pub mod message;
pub mod notification;
pub mod query;
pub mod room;
pub mod ws_event;

pub use message::{AckDTO, CreateMessageDTO, MessageDTO, MessageListDTO, SendMessageDTO};
pub use notification::{
    CreateNotificationDTO, NotificationDTO, NotificationListDTO, NotificationPayloadDTO,
    UnreadCountDTO,
};
pub use query::{MessagesQuery, NotificationsQuery};
pub use room::{EnsureRoomDTO, RoomDTO, RoomListDTO};
pub use ws_event::{ClientEventDTO, WsEventDTO};
