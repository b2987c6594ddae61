//! Client module - Lato client del sottosistema chat
//!
//! Una sessione utente possiede:
//! - un [`api::ApiClient`] per le richieste REST (invio messaggi, storia,
//!   notifiche); l'invio NON aggiunge nulla in locale, l'effetto visibile
//!   arriva solo con il broadcast;
//! - un [`multiplexer::ChatMultiplexer`] che condivide una sola connessione
//!   real-time tra tutte le superfici chat aperte;
//! - un [`notifier::NotificationPoller`] indipendente dal gateway, che
//!   converge sullo stesso stato osservabile.

pub mod api;
pub mod error;
pub mod multiplexer;
pub mod notifier;
pub mod transcript;
pub mod transport;

pub use api::{ApiClient, HistorySource};
pub use error::ClientError;
pub use multiplexer::{ChatMultiplexer, MultiplexerOptions, RoomSurface, SurfaceEvent};
pub use notifier::{NotificationFeed, NotificationPoller, UnreadSnapshot};
pub use transcript::Transcript;
