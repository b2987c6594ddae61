//! Access policy - Collaboratore esterno per i controlli di accesso
//!
//! L'esistenza di corsi e sezioni e chi può vederli appartengono alla
//! gerarchia accademica, fuori da questo sottosistema. Il trait è il punto
//! di aggancio; chi nega l'accesso vede NOT_FOUND, mai un indizio di
//! permesso.

use crate::core::auth::AuthUser;

pub trait AccessPolicy: Send + Sync {
    /// Ritorna true se l'utente può accedere alla coppia (corso, sezione).
    fn can_access(&self, user: &AuthUser, course_id: &str, section_id: &str) -> bool;
}

/// Policy permissiva usata nel wiring di default e nei test.
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn can_access(&self, _user: &AuthUser, _course_id: &str, _section_id: &str) -> bool {
        true
    }
}
