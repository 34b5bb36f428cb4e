//! tokio-tungstenite transport for the chat session.
//!
//! Each `open` spawns one task that owns the socket. Outbound text reaches it
//! over an unbounded channel; everything the socket does comes back to the
//! main loop as a [`SocketEvent`] tagged with the connection's generation so
//! events from a replaced socket can be told apart.

use chat_session_lib::{Channel, ChannelError, Connector, Frame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug)]
pub enum SocketEventKind {
    Opened,
    Frame(Frame),
    Closed,
}

#[derive(Debug)]
pub struct SocketEvent {
    pub generation: u64,
    pub kind: SocketEventKind,
}

/// Outbound half handed to the session
pub struct TerminalChannel {
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl Channel for TerminalChannel {
    fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        outbound
            .send(text.to_string())
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&mut self) {
        // Dropping the sender tells the socket task to shut down
        self.outbound = None;
    }
}

pub struct TerminalConnector {
    events: mpsc::UnboundedSender<SocketEvent>,
    generation: u64,
}

impl TerminalConnector {
    pub fn new(events: mpsc::UnboundedSender<SocketEvent>) -> Self {
        Self {
            events,
            generation: 0,
        }
    }

    /// Whether an event belongs to the most recently opened socket
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

impl Connector for TerminalConnector {
    type Channel = TerminalChannel;

    fn open(&mut self, url: &str) -> Result<TerminalChannel, ChannelError> {
        let url = Url::parse(url).map_err(|e| ChannelError::OpenFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.generation += 1;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(
            url,
            outbound_rx,
            self.events.clone(),
            self.generation,
        ));

        Ok(TerminalChannel {
            outbound: Some(outbound_tx),
        })
    }
}

async fn run_socket(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SocketEvent>,
    generation: u64,
) {
    let emit = |kind: SocketEventKind| {
        let _ = events.send(SocketEvent { generation, kind });
    };

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            emit(SocketEventKind::Closed);
            return;
        }
    };
    info!("Connected to {}", url);
    emit(SocketEventKind::Opened);

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = ws_read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    emit(SocketEventKind::Frame(Frame::Text(text)));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    emit(SocketEventKind::Frame(Frame::Binary(bytes)));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                None => {
                    info!("WebSocket stream ended");
                    break;
                }
            },

            text = outbound.recv() => match text {
                Some(text) => {
                    debug!("ws send: {} bytes", text.len());
                    if let Err(e) = ws_write.send(Message::Text(text)).await {
                        warn!("Failed to send message: {}", e);
                        break;
                    }
                }
                None => {
                    debug!("Channel released, closing socket");
                    let _ = ws_write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    emit(SocketEventKind::Closed);
}
