//! Transcript - Vista locale ordinata dei messaggi di una stanza
//!
//! Ogni superficie chat possiede il proprio transcript: stato transiente
//! di sessione, mai persistito. La deduplica per id copre sia la
//! ritrasmissione dal server sia l'eco del proprio invio che arriva dopo
//! una pagina di storia già acquisita.

use crate::dtos::MessageDTO;
use std::collections::HashSet;

#[derive(Default)]
pub struct Transcript {
    messages: Vec<MessageDTO>,
    seen: HashSet<i64>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserisce un messaggio mantenendo l'ordine (created_at, message_id).
    /// Ritorna false se l'id era già presente (duplicato scartato).
    pub fn ingest(&mut self, message: MessageDTO) -> bool {
        if !self.seen.insert(message.message_id) {
            return false;
        }

        let key = (message.created_at, message.message_id);
        let position = self
            .messages
            .partition_point(|m| (m.created_at, m.message_id) <= key);
        self.messages.insert(position, message);
        true
    }

    /// Applica un tombstone: il body viene trattenuto, la posizione resta.
    /// Idempotente, e valido anche per id mai visti (ignorati).
    pub fn apply_delete(&mut self, message_id: i64) -> bool {
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.message_id == message_id)
        {
            message.deleted = true;
            message.body = None;
            true
        } else {
            false
        }
    }

    /// Fonde una pagina di storia; ritorna quanti messaggi erano nuovi.
    pub fn merge_page(&mut self, page: Vec<MessageDTO>) -> usize {
        page.into_iter()
            .fold(0, |acc, m| if self.ingest(m) { acc + 1 } else { acc })
    }

    pub fn messages(&self) -> &[MessageDTO] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use chrono::{Duration, TimeZone, Utc};

    fn message(id: i64, offset_secs: i64) -> MessageDTO {
        let base = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        MessageDTO {
            message_id: id,
            room_id: 1,
            sender_id: 1,
            sender_role: UserRole::Student,
            sender_name: "alice".to_string(),
            body: Some(format!("message {id}")),
            created_at: base + Duration::seconds(offset_secs),
            deleted: false,
        }
    }

    #[test]
    fn ingest_keeps_chronological_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.ingest(message(2, 10)));
        assert!(transcript.ingest(message(1, 5)));
        assert!(transcript.ingest(message(3, 20)));

        let ids: Vec<i64> = transcript.messages().iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_delivery_is_discarded() {
        let mut transcript = Transcript::new();
        assert!(transcript.ingest(message(1, 0)));
        assert!(!transcript.ingest(message(1, 0)));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn same_timestamp_orders_by_id() {
        let mut transcript = Transcript::new();
        transcript.ingest(message(5, 0));
        transcript.ingest(message(3, 0));
        transcript.ingest(message(4, 0));

        let ids: Vec<i64> = transcript.messages().iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn tombstone_withholds_body_in_place() {
        let mut transcript = Transcript::new();
        transcript.ingest(message(1, 0));
        transcript.ingest(message(2, 5));

        assert!(transcript.apply_delete(1));
        let first = &transcript.messages()[0];
        assert_eq!(first.message_id, 1);
        assert!(first.deleted);
        assert!(first.body.is_none());
        // la posizione resta occupata dal tombstone
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn delete_unknown_id_is_ignored() {
        let mut transcript = Transcript::new();
        assert!(!transcript.apply_delete(99));
    }

    #[test]
    fn merge_page_dedups_against_broadcasts() {
        let mut transcript = Transcript::new();
        // eco di broadcast già applicato
        transcript.ingest(message(2, 10));

        let page = vec![message(1, 5), message(2, 10), message(3, 15)];
        let added = transcript.merge_page(page);

        assert_eq!(added, 2);
        let ids: Vec<i64> = transcript.messages().iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
