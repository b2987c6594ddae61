//! Core module - Stato condiviso, errori, autenticazione e configurazione

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use access::{AccessPolicy, OpenAccess};
pub use auth::{AuthUser, authentication_middleware};
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
