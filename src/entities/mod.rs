//! Entities module - Entità di dominio del sottosistema chat

pub mod enums;
pub mod message;
pub mod notification;
pub mod room;

pub use enums::{NotificationKind, UserRole};
pub use message::Message;
pub use notification::Notification;
pub use room::Room;
