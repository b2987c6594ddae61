//! ChatMultiplexer - Una connessione real-time condivisa per sessione
//!
//! Oggetto con scope di sessione, costruito una volta e passato per handle
//! a ogni superficie chat: niente stato condiviso a livello di processo.
//! L'interesse per una stanza è contato per riferimento: la prima
//! superficie invia `join_room`, l'ultima chiusura invia `leave_room`,
//! e la connessione sottostante non viene mai abbattuta finché la
//! sessione è viva (altre superfici potrebbero ancora servirsene).
//!
//! Alla perdita del trasporto la finestra di broadcast persa viene
//! riconciliata: re-join di ogni stanza sottoscritta e re-fetch della
//! pagina recente di storia, fatta passare dallo stesso percorso di
//! dedup dei broadcast.

use crate::client::api::HistorySource;
use crate::client::transport::{GatewayConnector, GatewaySocket};
use crate::dtos::{ClientEventDTO, MessageDTO, WsEventDTO};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Eventi consegnati a una superficie chat
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Broadcast di un nuovo messaggio della stanza
    MessageNew(MessageDTO),
    /// Tombstone: la superficie deve trattenere il body in place
    MessageDeleted { message_id: i64 },
    /// Pagina di storia (apertura o riconciliazione post-riconnessione)
    HistoryPage(Vec<MessageDTO>),
    /// Errore applicativo del gateway, riportato e mai ritentato
    GatewayError { code: u16, message: String },
}

enum Command {
    Open {
        room_id: i64,
        surface_id: u64,
        sink: UnboundedSender<SurfaceEvent>,
    },
    Close {
        room_id: i64,
        surface_id: u64,
    },
}

#[derive(Debug, Clone)]
pub struct MultiplexerOptions {
    /// Attesa tra due tentativi di riconnessione
    pub reconnect_delay: Duration,
    /// Dimensione della pagina di storia usata in riconciliazione
    pub history_page: i64,
}

impl Default for MultiplexerOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            history_page: 50,
        }
    }
}

/// Handle di sessione verso il task che possiede la connessione.
pub struct ChatMultiplexer {
    cmd_tx: UnboundedSender<Command>,
    next_surface_id: AtomicU64,
}

impl ChatMultiplexer {
    /// Avvia il task di sessione. `connector` riapre il trasporto a ogni
    /// tentativo; `history` fornisce le pagine di riconciliazione.
    pub fn spawn<C, H>(connector: C, history: H, options: MultiplexerOptions) -> Self
    where
        C: GatewayConnector,
        H: HistorySource,
    {
        let (cmd_tx, cmd_rx) = unbounded_channel();
        tokio::spawn(drive(connector, history, cmd_rx, options));
        Self {
            cmd_tx,
            next_surface_id: AtomicU64::new(1),
        }
    }

    /// Apre una superficie sulla stanza. Le superfici riusano la
    /// connessione di sessione, mai una connessione per superficie.
    pub fn open_room(&self, room_id: i64) -> RoomSurface {
        let surface_id = self.next_surface_id.fetch_add(1, Ordering::Relaxed);
        let (sink, events) = unbounded_channel();
        let _ = self.cmd_tx.send(Command::Open {
            room_id,
            surface_id,
            sink,
        });
        RoomSurface {
            room_id,
            surface_id,
            events,
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

/// Superficie chat: riceve gli eventi della propria stanza.
/// Alla chiusura (drop) rilascia l'interesse; la connessione resta viva.
pub struct RoomSurface {
    room_id: i64,
    surface_id: u64,
    events: UnboundedReceiver<SurfaceEvent>,
    cmd_tx: UnboundedSender<Command>,
}

impl RoomSurface {
    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    /// Prossimo evento; `None` quando la sessione è terminata.
    pub async fn next_event(&mut self) -> Option<SurfaceEvent> {
        self.events.recv().await
    }
}

impl Drop for RoomSurface {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Close {
            room_id: self.room_id,
            surface_id: self.surface_id,
        });
    }
}

#[derive(Default)]
struct Interest {
    sinks: Vec<(u64, UnboundedSender<SurfaceEvent>)>,
}

/// Task che possiede la connessione per tutta la sessione.
#[instrument(skip(connector, history, cmd_rx, options))]
async fn drive<C, H>(
    connector: C,
    history: H,
    mut cmd_rx: UnboundedReceiver<Command>,
    options: MultiplexerOptions,
) where
    C: GatewayConnector,
    H: HistorySource,
{
    let mut interests: HashMap<i64, Interest> = HashMap::new();

    'session: loop {
        // Connessione con retry trasparente. Gli errori applicativi non
        // passano di qui: solo il trasporto viene ritentato.
        let mut socket = loop {
            match connector.connect().await {
                Ok(socket) => break socket,
                Err(e) => {
                    warn!("Gateway connection failed: {e}, retrying");
                    let deadline = tokio::time::sleep(options.reconnect_delay);
                    tokio::pin!(deadline);
                    // mentre siamo offline le superfici possono comunque
                    // aprire e chiudere: si aggiorna solo lo stato locale
                    loop {
                        tokio::select! {
                            _ = &mut deadline => break,
                            cmd = cmd_rx.recv() => match cmd {
                                Some(cmd) => apply_offline(&mut interests, cmd),
                                None => return,
                            }
                        }
                    }
                }
            }
        };
        info!("Gateway connection established");

        // Finestra di broadcast potenzialmente persa: re-join di ogni
        // stanza sottoscritta e riconciliazione via storia, senza fidarsi
        // del solo stream riconnesso.
        for (&room_id, interest) in interests.iter() {
            if socket
                .send(ClientEventDTO::JoinRoom { room_id })
                .await
                .is_err()
            {
                warn!("Connection lost during re-join");
                continue 'session;
            }
            resync_room(&history, room_id, options.history_page, &interest.sinks).await;
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Open { room_id, surface_id, sink }) => {
                            let first_interest = !interests.contains_key(&room_id);
                            interests
                                .entry(room_id)
                                .or_default()
                                .sinks
                                .push((surface_id, sink.clone()));

                            if first_interest
                                && socket
                                    .send(ClientEventDTO::JoinRoom { room_id })
                                    .await
                                    .is_err()
                            {
                                warn!("Connection lost during join");
                                continue 'session;
                            }

                            // pagina iniziale solo alla nuova superficie;
                            // i broadcast live nel frattempo si fondono per id
                            resync_room(
                                &history,
                                room_id,
                                options.history_page,
                                &[(surface_id, sink)],
                            )
                            .await;
                        }
                        Some(Command::Close { room_id, surface_id }) => {
                            if release_surface(&mut interests, room_id, surface_id)
                                && socket
                                    .send(ClientEventDTO::LeaveRoom { room_id })
                                    .await
                                    .is_err()
                            {
                                warn!("Connection lost during leave");
                                continue 'session;
                            }
                        }
                        None => {
                            info!("Session ended, multiplexer shutting down");
                            return;
                        }
                    }
                }

                event = socket.recv() => {
                    match event {
                        Some(event) => route_event(&mut interests, event),
                        None => {
                            warn!("Gateway connection lost");
                            continue 'session;
                        }
                    }
                }
            }
        }
    }
}

/// Aggiorna l'interesse mentre il trasporto è giù: join e leave verranno
/// riallineati alla prossima connessione.
fn apply_offline(interests: &mut HashMap<i64, Interest>, cmd: Command) {
    match cmd {
        Command::Open {
            room_id,
            surface_id,
            sink,
        } => {
            interests
                .entry(room_id)
                .or_default()
                .sinks
                .push((surface_id, sink));
        }
        Command::Close {
            room_id,
            surface_id,
        } => {
            release_surface(interests, room_id, surface_id);
        }
    }
}

/// Rimuove la superficie; ritorna true se era l'ultima della stanza
/// (interesse a zero, leave dovuto).
fn release_surface(interests: &mut HashMap<i64, Interest>, room_id: i64, surface_id: u64) -> bool {
    if let Some(interest) = interests.get_mut(&room_id) {
        interest.sinks.retain(|(id, _)| *id != surface_id);
        if interest.sinks.is_empty() {
            interests.remove(&room_id);
            debug!(room_id, "Last surface closed, releasing room");
            return true;
        }
    }
    false
}

/// Instrada un evento del gateway alle superfici della stanza interessata.
fn route_event(interests: &mut HashMap<i64, Interest>, event: WsEventDTO) {
    match event {
        WsEventDTO::MessageNew(message) => {
            if let Some(interest) = interests.get_mut(&message.room_id) {
                interest
                    .sinks
                    .retain(|(_, sink)| sink.send(SurfaceEvent::MessageNew(message.clone())).is_ok());
            } else {
                debug!(room_id = message.room_id, "Event for room without surfaces, dropped");
            }
        }
        WsEventDTO::MessageDeleted {
            message_id,
            room_id,
        } => {
            if let Some(interest) = interests.get_mut(&room_id) {
                interest
                    .sinks
                    .retain(|(_, sink)| sink.send(SurfaceEvent::MessageDeleted { message_id }).is_ok());
            }
        }
        WsEventDTO::Error { code, message } => {
            // errore senza stanza: riportato a tutte le superfici
            for interest in interests.values_mut() {
                interest.sinks.retain(|(_, sink)| {
                    sink.send(SurfaceEvent::GatewayError {
                        code,
                        message: message.clone(),
                    })
                    .is_ok()
                });
            }
        }
    }
}

/// Recupera la pagina recente e la consegna come `HistoryPage`.
/// Il fallimento degrada con un warn: la prossima riconnessione riprova.
async fn resync_room<H: HistorySource>(
    history: &H,
    room_id: i64,
    limit: i64,
    sinks: &[(u64, UnboundedSender<SurfaceEvent>)],
) {
    match history.recent(room_id, limit).await {
        Ok(page) => {
            for (_, sink) in sinks {
                let _ = sink.send(SurfaceEvent::HistoryPage(page.clone()));
            }
        }
        Err(e) => warn!(room_id, "History resync failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::ClientError;
    use crate::client::transport::ChannelGatewayConnector;
    use crate::client::transcript::Transcript;
    use crate::entities::UserRole;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, timeout};

    #[derive(Clone, Default)]
    struct FakeHistory {
        pages: Arc<Mutex<HashMap<i64, Vec<MessageDTO>>>>,
    }

    impl FakeHistory {
        fn set_page(&self, room_id: i64, page: Vec<MessageDTO>) {
            self.pages.lock().unwrap().insert(room_id, page);
        }
    }

    impl HistorySource for FakeHistory {
        async fn recent(&self, room_id: i64, _limit: i64) -> Result<Vec<MessageDTO>, ClientError> {
            Ok(self
                .pages
                .lock()
                .unwrap()
                .get(&room_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn message(id: i64, room_id: i64, offset_secs: i64) -> MessageDTO {
        let base = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        MessageDTO {
            message_id: id,
            room_id,
            sender_id: 1,
            sender_role: UserRole::Student,
            sender_name: "alice".to_string(),
            body: Some(format!("message {id}")),
            created_at: base + ChronoDuration::seconds(offset_secs),
            deleted: false,
        }
    }

    fn fast_options() -> MultiplexerOptions {
        MultiplexerOptions {
            reconnect_delay: Duration::from_millis(10),
            history_page: 50,
        }
    }

    async fn expect_event(surface: &mut RoomSurface) -> SurfaceEvent {
        timeout(Duration::from_secs(2), surface.next_event())
            .await
            .expect("timed out waiting for surface event")
            .expect("surface channel closed")
    }

    #[tokio::test]
    async fn first_surface_joins_last_close_leaves() {
        let connector = ChannelGatewayConnector::new();
        let (mut server_rx, _server_tx) = connector.stage();
        let mux = ChatMultiplexer::spawn(connector, FakeHistory::default(), fast_options());

        let surface_a = mux.open_room(7);
        let surface_b = mux.open_room(7);

        // un solo join per la stanza, indipendentemente dalle superfici
        let event = timeout(Duration::from_secs(2), server_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, ClientEventDTO::JoinRoom { room_id: 7 });

        drop(surface_a);
        sleep(Duration::from_millis(50)).await;
        assert!(
            server_rx.try_recv().is_err(),
            "leave must not be sent while a surface is still open"
        );

        drop(surface_b);
        let event = timeout(Duration::from_secs(2), server_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, ClientEventDTO::LeaveRoom { room_id: 7 });
    }

    #[tokio::test]
    async fn duplicate_delivery_yields_single_entry() {
        let connector = ChannelGatewayConnector::new();
        let (mut server_rx, server_tx) = connector.stage();
        let mux = ChatMultiplexer::spawn(connector, FakeHistory::default(), fast_options());

        let mut surface = mux.open_room(7);
        let _ = server_rx.recv().await; // join

        // pagina iniziale (vuota)
        assert_eq!(expect_event(&mut surface).await, SurfaceEvent::HistoryPage(vec![]));

        // consegna duplicata dello stesso message_id
        let m1 = message(1, 7, 0);
        server_tx.send(WsEventDTO::MessageNew(m1.clone())).unwrap();
        server_tx.send(WsEventDTO::MessageNew(m1.clone())).unwrap();

        let mut transcript = Transcript::new();
        for _ in 0..2 {
            match expect_event(&mut surface).await {
                SurfaceEvent::MessageNew(m) => {
                    transcript.ingest(m);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].message_id, 1);
    }

    #[tokio::test]
    async fn events_are_routed_to_the_matching_room() {
        let connector = ChannelGatewayConnector::new();
        let (mut server_rx, server_tx) = connector.stage();
        let mux = ChatMultiplexer::spawn(connector, FakeHistory::default(), fast_options());

        let mut surface_a = mux.open_room(1);
        let mut surface_b = mux.open_room(2);
        let _ = server_rx.recv().await; // join 1
        let _ = server_rx.recv().await; // join 2
        assert_eq!(expect_event(&mut surface_a).await, SurfaceEvent::HistoryPage(vec![]));
        assert_eq!(expect_event(&mut surface_b).await, SurfaceEvent::HistoryPage(vec![]));

        server_tx
            .send(WsEventDTO::MessageNew(message(10, 2, 0)))
            .unwrap();

        match expect_event(&mut surface_b).await {
            SurfaceEvent::MessageNew(m) => assert_eq!(m.room_id, 2),
            other => panic!("unexpected event: {other:?}"),
        }
        // la superficie dell'altra stanza non deve vedere nulla
        sleep(Duration::from_millis(50)).await;
        assert!(timeout(Duration::from_millis(10), surface_a.next_event())
            .await
            .is_err());
    }

    /// Disconnessione con messaggi persi nel mezzo: dopo la riconnessione
    /// il transcript contiene ogni messaggio esattamente una volta,
    /// nell'ordine giusto, senza duplicati dai broadcast bufferizzati.
    #[tokio::test]
    async fn reconnect_rejoins_and_reconciles_history() {
        let connector = ChannelGatewayConnector::new();
        let history = FakeHistory::default();
        let (mut server_rx1, server_tx1) = connector.stage();
        let mux = ChatMultiplexer::spawn(connector.clone(), history.clone(), fast_options());

        let mut surface = mux.open_room(7);
        let join = timeout(Duration::from_secs(2), server_rx1.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(join, ClientEventDTO::JoinRoom { room_id: 7 });
        assert_eq!(expect_event(&mut surface).await, SurfaceEvent::HistoryPage(vec![]));

        let mut transcript = Transcript::new();

        // un messaggio arriva mentre la connessione è viva
        let m1 = message(1, 7, 0);
        server_tx1.send(WsEventDTO::MessageNew(m1.clone())).unwrap();
        match expect_event(&mut surface).await {
            SurfaceEvent::MessageNew(m) => {
                transcript.ingest(m);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // caduta del trasporto: 3 messaggi vengono appesi durante il buio
        drop(server_tx1);
        drop(server_rx1);
        history.set_page(
            7,
            vec![
                m1.clone(),
                message(2, 7, 10),
                message(3, 7, 20),
                message(4, 7, 30),
            ],
        );

        // il gateway torna raggiungibile
        sleep(Duration::from_millis(30)).await;
        let (mut server_rx2, _server_tx2) = connector.stage();

        // re-join automatico della stanza già sottoscritta
        let rejoin = timeout(Duration::from_secs(2), server_rx2.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rejoin, ClientEventDTO::JoinRoom { room_id: 7 });

        // riconciliazione: la pagina passa dal percorso di dedup
        match expect_event(&mut surface).await {
            SurfaceEvent::HistoryPage(page) => {
                transcript.merge_page(page);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let ids: Vec<i64> = transcript.messages().iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn tombstone_event_reaches_the_surface() {
        let connector = ChannelGatewayConnector::new();
        let (mut server_rx, server_tx) = connector.stage();
        let mux = ChatMultiplexer::spawn(connector, FakeHistory::default(), fast_options());

        let mut surface = mux.open_room(7);
        let _ = server_rx.recv().await;
        assert_eq!(expect_event(&mut surface).await, SurfaceEvent::HistoryPage(vec![]));

        let mut transcript = Transcript::new();
        server_tx
            .send(WsEventDTO::MessageNew(message(1, 7, 0)))
            .unwrap();
        match expect_event(&mut surface).await {
            SurfaceEvent::MessageNew(m) => {
                transcript.ingest(m);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        server_tx
            .send(WsEventDTO::MessageDeleted {
                message_id: 1,
                room_id: 7,
            })
            .unwrap();
        match expect_event(&mut surface).await {
            SurfaceEvent::MessageDeleted { message_id } => {
                transcript.apply_delete(message_id);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let entry = &transcript.messages()[0];
        assert!(entry.deleted);
        assert!(entry.body.is_none());
    }
}
