//! Integration tests per il log dei messaggi
//!
//! Coprono le proprietà osservabili del log: determinismo della
//! paginazione, permanenza dei tombstone, controllo dei ruoli sulla
//! cancellazione.

mod common;

#[cfg(test)]
mod message_tests {
    use super::common::*;
    use aula_chat::core::AppState;
    use aula_chat::dtos::CreateMessageDTO;
    use aula_chat::entities::UserRole;
    use aula_chat::repositories::Create;
    use axum_test::http::HeaderName;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    /// Semina `count` messaggi con timestamp distinti e crescenti,
    /// ritornando gli id nell'ordine di creazione
    async fn seed_messages(
        state: &Arc<AppState>,
        room_id: i64,
        count: i64,
    ) -> sqlx::Result<Vec<i64>> {
        let base = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        let mut ids = Vec::new();
        for i in 0..count {
            let created = state
                .msg
                .create(&CreateMessageDTO {
                    room_id,
                    sender_id: 1,
                    sender_role: UserRole::Student,
                    sender_name: "alice".to_string(),
                    body: format!("message {}", i + 1),
                    created_at: base + Duration::seconds(i),
                })
                .await?;
            ids.push(created.message_id);
        }
        Ok(ids)
    }

    // ============================================================
    // Test per POST /chat/rooms/{room_id}/messages - post_room_message
    // ============================================================

    #[sqlx::test]
    async fn test_post_and_list_roundtrip(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let token = create_test_jwt(5, "alice", UserRole::Student);

        let room = state.room.ensure("C1", "S1").await?;

        let response = server
            .post(&format!("/chat/rooms/{}/messages", room.room_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .json(&json!({"body": "Hello"}))
            .await;

        response.assert_status_ok();
        let created: serde_json::Value = response.json();
        assert_eq!(created["body"], "Hello");
        assert_eq!(created["sender_id"], 5);
        assert_eq!(created["sender_name"], "alice");
        assert_eq!(created["sender_role"], "student");
        assert_eq!(created["deleted"], false);

        let list = server
            .get(&format!("/chat/rooms/{}/messages", room.room_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .await;
        list.assert_status_ok();
        let list: serde_json::Value = list.json();
        let messages = list["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["message_id"], created["message_id"]);
        assert_eq!(messages[0]["body"], "Hello");

        Ok(())
    }

    /// Un body vuoto dopo il trim viene rifiutato inline, senza retry
    #[sqlx::test]
    async fn test_post_rejects_blank_body(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let token = create_test_jwt(5, "alice", UserRole::Student);

        let room = state.room.ensure("C1", "S1").await?;

        let response = server
            .post(&format!("/chat/rooms/{}/messages", room.room_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .json(&json!({"body": "   "}))
            .await;

        response.assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test]
    async fn test_post_to_unknown_room_is_not_found(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state);
        let token = create_test_jwt(5, "alice", UserRole::Student);

        let response = server
            .post("/chat/rooms/999/messages")
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .json(&json!({"body": "Hello"}))
            .await;

        response.assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Test per GET /chat/rooms/{room_id}/messages - get_room_messages
    // ============================================================

    /// Due chiamate identiche su un log statico ritornano esattamente
    /// la stessa sequenza ordinata
    #[sqlx::test]
    async fn test_pagination_is_deterministic(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let token = create_test_jwt(1, "alice", UserRole::Student);

        let room = state.room.ensure("C1", "S1").await?;
        seed_messages(&state, room.room_id, 10).await?;

        let base = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        let cursor = (base + Duration::seconds(5)).to_rfc3339();

        let mut bodies = Vec::new();
        for _ in 0..2 {
            let response = server
                .get(&format!("/chat/rooms/{}/messages", room.room_id))
                .add_header(
                    HeaderName::from_static("authorization"),
                    format!("Bearer {}", token),
                )
                .add_query_param("before", &cursor)
                .add_query_param("limit", 3)
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            bodies.push(body);
        }
        assert_eq!(bodies[0], bodies[1]);

        // strettamente precedenti al cursore, in ordine crescente
        let messages = bodies[0]["messages"].as_array().unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m["body"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["message 3", "message 4", "message 5"]);

        Ok(())
    }

    /// Pagine sequenziali (before = created_at più vecchio della pagina
    /// precedente) sono disgiunte e coprono tutto il log
    #[sqlx::test]
    async fn test_sequential_pages_are_disjoint_and_complete(
        pool: SqlitePool,
    ) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let token = create_test_jwt(1, "alice", UserRole::Student);

        let room = state.room.ensure("C1", "S1").await?;
        seed_messages(&state, room.room_id, 10).await?;

        let mut collected: Vec<i64> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = server
                .get(&format!("/chat/rooms/{}/messages", room.room_id))
                .add_header(
                    HeaderName::from_static("authorization"),
                    format!("Bearer {}", token),
                )
                .add_query_param("limit", 3);
            if let Some(before) = &cursor {
                request = request.add_query_param("before", before);
            }

            let response = request.await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            let messages = body["messages"].as_array().unwrap().clone();
            if messages.is_empty() {
                break;
            }

            for message in &messages {
                let id = message["message_id"].as_i64().unwrap();
                assert!(
                    !collected.contains(&id),
                    "Le pagine sequenziali devono essere disgiunte"
                );
                collected.push(id);
            }

            cursor = Some(messages[0]["created_at"].as_str().unwrap().to_string());
        }

        assert_eq!(collected.len(), 10, "La paginazione non deve avere buchi");
        Ok(())
    }

    /// Senza cursore arrivano gli ultimi `limit` messaggi, crescenti
    #[sqlx::test]
    async fn test_default_page_returns_most_recent(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let token = create_test_jwt(1, "alice", UserRole::Student);

        let room = state.room.ensure("C1", "S1").await?;
        seed_messages(&state, room.room_id, 60).await?;

        let response = server
            .get(&format!("/chat/rooms/{}/messages", room.room_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 50, "Default page size deve essere 50");
        assert_eq!(messages[0]["body"], "message 11");
        assert_eq!(messages[49]["body"], "message 60");

        Ok(())
    }

    // ============================================================
    // Test per DELETE /chat/messages/{message_id} - delete_message
    // ============================================================

    /// Scenario: uno studente scrive, un admin cancella. Da quel momento
    /// ogni lettura mostra il tombstone e mai più il testo originale.
    #[sqlx::test]
    async fn test_tombstone_is_permanent(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let student = create_test_jwt(5, "alice", UserRole::Student);
        let admin = create_test_jwt(1, "root", UserRole::Admin);

        let room = state.room.ensure("C1", "S1").await?;

        let created = server
            .post(&format!("/chat/rooms/{}/messages", room.room_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", student),
            )
            .json(&json!({"body": "please delete me"}))
            .await;
        created.assert_status_ok();
        let created: serde_json::Value = created.json();
        let message_id = created["message_id"].as_i64().unwrap();

        let deleted = server
            .delete(&format!("/chat/messages/{}", message_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", admin),
            )
            .await;
        deleted.assert_status_ok();
        let ack: serde_json::Value = deleted.json();
        assert_eq!(ack["ok"], true);

        // ogni lettura successiva, da qualunque chiamante, vede il tombstone
        for token in [&student, &admin] {
            let list = server
                .get(&format!("/chat/rooms/{}/messages", room.room_id))
                .add_header(
                    HeaderName::from_static("authorization"),
                    format!("Bearer {}", token),
                )
                .await;
            list.assert_status_ok();
            let list: serde_json::Value = list.json();
            let messages = list["messages"].as_array().unwrap();
            assert_eq!(messages.len(), 1, "Il tombstone tiene il posto in lista");
            assert_eq!(messages[0]["message_id"], message_id);
            assert_eq!(messages[0]["deleted"], true);
            assert!(
                messages[0]["body"].is_null(),
                "Il testo originale non deve mai riapparire"
            );
        }

        // cancellare di nuovo è un successo idempotente
        let again = server
            .delete(&format!("/chat/messages/{}", message_id))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", admin),
            )
            .await;
        again.assert_status_ok();

        Ok(())
    }

    /// La cancellazione è riservata ai ruoli privilegiati
    #[sqlx::test]
    async fn test_delete_requires_privileged_role(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());
        let student = create_test_jwt(5, "alice", UserRole::Student);
        let teacher = create_test_jwt(6, "bob", UserRole::Teacher);
        let dean = create_test_jwt(7, "carol", UserRole::Dean);

        let room = state.room.ensure("C1", "S1").await?;
        let ids = seed_messages(&state, room.room_id, 1).await?;

        for token in [&student, &teacher] {
            let response = server
                .delete(&format!("/chat/messages/{}", ids[0]))
                .add_header(
                    HeaderName::from_static("authorization"),
                    format!("Bearer {}", token),
                )
                .await;
            response.assert_status_forbidden();
        }

        // dean-equivalent può
        let response = server
            .delete(&format!("/chat/messages/{}", ids[0]))
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", dean),
            )
            .await;
        response.assert_status_ok();

        Ok(())
    }

    #[sqlx::test]
    async fn test_delete_unknown_message_is_not_found(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state);
        let admin = create_test_jwt(1, "root", UserRole::Admin);

        let response = server
            .delete("/chat/messages/424242")
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", admin),
            )
            .await;

        response.assert_status_not_found();
        Ok(())
    }
}
