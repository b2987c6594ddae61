use aula_chat::core::auth::encode_jwt;
use aula_chat::core::{AppState, OpenAccess};
use aula_chat::entities::UserRole;
use axum_test::TestServer;
use sqlx::SqlitePool;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Crea un AppState per i test, con policy di accesso permissiva
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    Arc::new(AppState::new(
        pool,
        TEST_JWT_SECRET.to_string(),
        Arc::new(OpenAccess),
    ))
}

/// Crea un TestServer pronto per eseguire richieste
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = aula_chat::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT valido 24 ore per l'utente di test indicato
pub fn create_test_jwt(user_id: i64, name: &str, role: UserRole) -> String {
    encode_jwt(user_id, name.to_string(), role, TEST_JWT_SECRET)
        .expect("Failed to create JWT token")
}
