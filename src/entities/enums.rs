//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Hod,
    Dean,
    Admin,
}

impl UserRole {
    /// Ruoli abilitati alla cancellazione (tombstone) dei messaggi.
    pub fn can_delete_messages(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Dean | UserRole::Hod)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Announcement,
    System,
}
