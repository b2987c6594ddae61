//! Transport - Astrazione della connessione verso il gateway real-time
//!
//! Il multiplexer lavora contro i trait [`GatewayConnector`] e
//! [`GatewaySocket`]; le implementazioni concrete sono:
//! - [`WsGatewayConnector`] — WebSocket autenticato (produzione)
//! - [`ChannelGatewayConnector`] — trasporto in-process su canali, usato
//!   nei test per pilotare disconnessioni e riconnessioni

use crate::client::error::ClientError;
use crate::dtos::{ClientEventDTO, WsEventDTO};
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::warn;

/// Lato client di una connessione al gateway.
///
/// `recv` ritorna `None` alla chiusura del trasporto: da lì in poi la
/// connessione è da considerare persa e va riaperta dal connector.
pub trait GatewaySocket: Send {
    fn send(
        &mut self,
        event: ClientEventDTO,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn recv(&mut self) -> impl Future<Output = Option<WsEventDTO>> + Send;
}

/// Fabbrica di connessioni: una per tentativo, anche in riconnessione.
pub trait GatewayConnector: Send + Sync + 'static {
    type Socket: GatewaySocket + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Socket, ClientError>> + Send;
}

/// Connessione WebSocket autenticata con bearer token all'handshake.
pub struct WsGatewayConnector {
    url: String,
    token: String,
}

impl WsGatewayConnector {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

impl GatewayConnector for WsGatewayConnector {
    type Socket = WsGatewaySocket;

    async fn connect(&self) -> Result<WsGatewaySocket, ClientError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let header = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| ClientError::Auth(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(WsGatewaySocket { stream })
    }
}

pub struct WsGatewaySocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl GatewaySocket for WsGatewaySocket {
    async fn send(&mut self, event: ClientEventDTO) -> Result<(), ClientError> {
        let json =
            serde_json::to_string(&event).map_err(|e| ClientError::Transport(e.to_string()))?;
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<WsEventDTO> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<WsEventDTO>(&text) {
                    Ok(event) => return Some(event),
                    Err(_) => warn!("Failed to deserialize gateway event, frame dropped"),
                },
                Ok(Message::Close(_)) => return None,
                Err(e) => {
                    warn!("WebSocket error: {:?}", e);
                    return None;
                }
                // ping/pong gestiti dalla libreria
                Ok(_) => {}
            }
        }
        None
    }
}

/// Trasporto in-process su canali.
///
/// Ogni "connessione accettata" va preparata con [`stage`](Self::stage):
/// il chiamante riceve le teste lato server (eventi in uscita dal client,
/// sender degli eventi verso il client). `connect` fallisce finché non c'è
/// una connessione pronta, il che permette di simulare un gateway
/// irraggiungibile.
pub struct ChannelGatewayConnector {
    staged: Arc<std::sync::Mutex<VecDeque<ChannelGatewaySocket>>>,
}

impl ChannelGatewayConnector {
    pub fn new() -> Self {
        Self {
            staged: Arc::new(std::sync::Mutex::new(VecDeque::new())),
        }
    }

    /// Prepara la prossima connessione e ritorna le teste lato server.
    pub fn stage(
        &self,
    ) -> (
        UnboundedReceiver<ClientEventDTO>,
        UnboundedSender<WsEventDTO>,
    ) {
        let (out_tx, out_rx) = unbounded_channel();
        let (in_tx, in_rx) = unbounded_channel();
        self.staged
            .lock()
            .expect("staged connections lock poisoned")
            .push_back(ChannelGatewaySocket {
                outbound: out_tx,
                inbound: in_rx,
            });
        (out_rx, in_tx)
    }
}

impl Default for ChannelGatewayConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChannelGatewayConnector {
    fn clone(&self) -> Self {
        Self {
            staged: self.staged.clone(),
        }
    }
}

impl GatewayConnector for ChannelGatewayConnector {
    type Socket = ChannelGatewaySocket;

    async fn connect(&self) -> Result<ChannelGatewaySocket, ClientError> {
        self.staged
            .lock()
            .expect("staged connections lock poisoned")
            .pop_front()
            .ok_or_else(|| ClientError::Transport("gateway unreachable".to_string()))
    }
}

pub struct ChannelGatewaySocket {
    outbound: UnboundedSender<ClientEventDTO>,
    inbound: UnboundedReceiver<WsEventDTO>,
}

impl GatewaySocket for ChannelGatewaySocket {
    async fn send(&mut self, event: ClientEventDTO) -> Result<(), ClientError> {
        self.outbound
            .send(event)
            .map_err(|_| ClientError::Transport("connection closed".to_string()))
    }

    async fn recv(&mut self) -> Option<WsEventDTO> {
        self.inbound.recv().await
    }
}
