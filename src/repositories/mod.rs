//! Repositories module - Accesso al database

pub mod message;
pub mod notification;
pub mod room;
pub mod traits;

pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use room::RoomRepository;
pub use traits::{Create, Read};
