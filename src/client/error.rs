//! Errori lato client
//!
//! Tassonomia ricalcata sulle risposte del server: gli errori applicativi
//! vengono riportati al chiamante e mai ritentati; solo la riconnessione
//! del trasporto viene ritentata (dal multiplexer, in modo trasparente).

/// Errors surfaced by the client-side components.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credenziale mancante o invalida: nessun retry automatico
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Richiesta rifiutata dalla validazione (es. body vuoto)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operazione negata per ruolo insufficiente
    #[error("operation not permitted: {0}")]
    Permission(String),

    /// Stanza, messaggio o coppia corso/sezione sconosciuta
    #[error("not found: {0}")]
    NotFound(String),

    /// Guasto di rete transitorio: riportato come stato di fallimento,
    /// l'invio non viene ritentato per non creare ambiguità di duplicati
    #[error("transient network failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
