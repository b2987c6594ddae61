//! NotificationPoller - Canale notifiche a polling
//!
//! Indipendente dal gateway real-time: un poll a intervallo fisso del
//! conteggio non letti, con escalation alla lista completa solo quando il
//! conteggio è diverso da zero. Push e poll sono due produttori dello
//! stesso stato logico: la riconciliazione usa un marcatore monotono di
//! acknowledgement (generation), non last-write-wins, così un poll partito
//! prima del mark-all-read non può resuscitare un badge già azzerato.

use crate::client::error::ClientError;
use crate::dtos::{NotificationDTO, NotificationPayloadDTO};
use std::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Periodo di polling di default
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(10);

/// Dimensione pagina usata per l'escalation alla lista
pub const LIST_PAGE_SIZE: i64 = 100;

/// Sorgente delle notifiche (l'ApiClient in produzione, un finto feed nei test).
pub trait NotificationFeed: Send + Sync + 'static {
    fn unread_count(&self) -> impl Future<Output = Result<u64, ClientError>> + Send;

    fn notifications(
        &self,
        page: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<NotificationDTO>, ClientError>> + Send;

    fn mark_all_read(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Stato osservabile del badge notifiche.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadSnapshot {
    pub unread: u64,
    /// Non lette di tipo annuncio (segnalate diversamente dalla UI)
    pub announcements: u64,
    pub other: u64,
}

struct CounterState {
    snapshot: UnreadSnapshot,
    /// Incrementata a ogni acknowledgement: i poll partiti sotto una
    /// generation precedente scartano il proprio risultato
    generation: u64,
}

pub struct NotificationPoller<F> {
    feed: F,
    state: Mutex<CounterState>,
    period: Duration,
}

impl<F: NotificationFeed> NotificationPoller<F> {
    pub fn new(feed: F, period: Duration) -> Self {
        Self {
            feed,
            state: Mutex::new(CounterState {
                snapshot: UnreadSnapshot::default(),
                generation: 0,
            }),
            period,
        }
    }

    /// Stato corrente del badge
    pub fn snapshot(&self) -> UnreadSnapshot {
        self.state
            .lock()
            .expect("notification state lock poisoned")
            .snapshot
            .clone()
    }

    /// Loop di polling a intervallo fisso. Gira per tutta la sessione,
    /// indipendentemente da quali stanze sono aperte.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.period);
        interval.tick().await; // consuma il primo tick immediato
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    /// Un giro di poll: conteggio, ed eventuale classificazione per tipo.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) {
        let generation_at_start = self
            .state
            .lock()
            .expect("notification state lock poisoned")
            .generation;

        let unread = match self.feed.unread_count().await {
            Ok(count) => count,
            Err(e) => {
                // il prossimo giro riprova: il badge tiene il valore noto
                warn!("Unread count poll failed: {e}");
                return;
            }
        };

        let mut snapshot = UnreadSnapshot {
            unread,
            ..Default::default()
        };

        if unread > 0 {
            // escalation alla lista solo quando c'è qualcosa da mostrare;
            // best-effort: se fallisce degrada a lista vuota senza toccare
            // il segnale primario del conteggio
            let page = match self.feed.notifications(1, LIST_PAGE_SIZE).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Notification list prefetch failed: {e}");
                    Vec::new()
                }
            };

            for notification in page.iter().filter(|n| !n.read) {
                match notification.payload {
                    NotificationPayloadDTO::Announcement { .. } => snapshot.announcements += 1,
                    NotificationPayloadDTO::System => snapshot.other += 1,
                }
            }
        }

        let mut state = self
            .state
            .lock()
            .expect("notification state lock poisoned");
        if state.generation != generation_at_start {
            // un mark-all-read è passato mentre il poll era in volo:
            // il risultato è stantio e non deve sovrascrivere lo zero
            debug!("Stale poll result discarded");
            return;
        }
        state.snapshot = snapshot;
    }

    /// L'utente ha aperto la lista: mark-all-read lato server e azzeramento
    /// immediato del contatore locale, senza aspettare il prossimo poll.
    #[instrument(skip(self))]
    pub async fn acknowledge_all(&self) -> Result<(), ClientError> {
        self.feed.mark_all_read().await?;

        let mut state = self
            .state
            .lock()
            .expect("notification state lock poisoned");
        state.generation += 1;
        state.snapshot = UnreadSnapshot::default();
        info!("All notifications acknowledged");
        Ok(())
    }
}
