use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use wavelink_core::{DuplexChannel, DuplexTransport, TransportError, TransportErrorKind};
use wavelink_domain::Credential;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the update channel as a WebSocket at a fixed URL.
///
/// The access token travels as an `Authorization: Bearer` header on the
/// upgrade request; a 401 handshake response surfaces as
/// [`TransportErrorKind::Unauthorized`].
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), connect_timeout: DEFAULT_CONNECT_TIMEOUT }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DuplexTransport for WebSocketTransport {
    async fn open(&self, credential: &Credential) -> Result<Box<dyn DuplexChannel>, TransportError> {
        let mut request = self.url.as_str().into_client_request().map_err(|err| {
            let message = format!("invalid url {}: {err}", self.url);
            TransportError::new(TransportErrorKind::Protocol, message)
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential.access_token))
            .map_err(|_| TransportError::unauthorized("access token is not a header value"))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        debug!(url = %self.url, "opening websocket");
        let (socket, response) = timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                TransportError::new(TransportErrorKind::Timeout, "websocket handshake timed out")
            })?
            .map_err(handshake_error)?;
        debug!(status = %response.status(), "websocket open");

        Ok(Box::new(WebSocketChannel { socket }))
    }
}

fn handshake_error(err: WsError) -> TransportError {
    match err {
        WsError::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            TransportError::unauthorized("handshake rejected with 401")
        }
        WsError::Http(response) => {
            TransportError::unreachable(format!("handshake rejected with {}", response.status()))
        }
        other => TransportError::unreachable(other.to_string()),
    }
}

struct WebSocketChannel {
    socket: Socket,
}

#[async_trait]
impl DuplexChannel for WebSocketChannel {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(frame))
            .await
            .map_err(|err| TransportError::closed(format!("websocket send failed: {err}")))
    }

    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket closed by peer");
                    return None;
                }
                // Ping replies are queued by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Binary(data)) => {
                    warn!(len = data.len(), "ignoring binary websocket frame");
                }
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(err) => {
                    let message = format!("websocket read failed: {err}");
                    return Some(Err(TransportError::closed(message)));
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.socket.close(None).await {
            debug!(error = %err, "websocket close failed");
        }
    }
}
