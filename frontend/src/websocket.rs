//! gloo-net WebSocket transport for the chat session

use std::cell::{Cell, RefCell};
use std::future::poll_fn;
use std::pin::Pin;
use std::rc::Rc;

use chat_session_lib::{Channel, ChannelError, Connector, Frame};
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message, State};
use wasm_bindgen_futures::spawn_local;
use yew::Callback;

/// Socket lifecycle reported back to the widget
pub enum ChannelEvent {
    Opened,
    Frame(Frame),
    Closed,
}

/// Shared WebSocket sender; empty until the socket opens
pub type WsSender = Rc<RefCell<Option<SplitSink<WebSocket, Message>>>>;

/// Outbound half of one socket.
pub struct WsChannel {
    sender: WsSender,
    /// Set once the session lets go of this socket; silences its events
    retired: Rc<Cell<bool>>,
}

impl Channel for WsChannel {
    fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        if self.sender.borrow().is_none() {
            return Err(ChannelError::Closed);
        }

        let sender_rc = self.sender.clone();
        let text = text.to_string();
        spawn_local(async move {
            let maybe_sender = sender_rc.borrow_mut().take();
            if let Some(mut sender) = maybe_sender {
                if let Err(e) = sender.send(Message::Text(text)).await {
                    log::warn!("WebSocket send failed: {:?}", e);
                }
                *sender_rc.borrow_mut() = Some(sender);
            }
        });
        Ok(())
    }

    fn close(&mut self) {
        self.retired.set(true);
        let maybe_sender = self.sender.borrow_mut().take();
        if let Some(mut sender) = maybe_sender {
            spawn_local(async move {
                let _ = sender.close().await;
            });
        }
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.retired.set(true);
    }
}

/// Opens sockets and forwards their events to the widget.
pub struct WsConnector {
    on_event: Callback<ChannelEvent>,
}

impl WsConnector {
    pub fn new(on_event: Callback<ChannelEvent>) -> Self {
        Self { on_event }
    }
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    fn open(&mut self, url: &str) -> Result<WsChannel, ChannelError> {
        let ws = WebSocket::open(url).map_err(|e| ChannelError::OpenFailed {
            url: url.to_string(),
            reason: format!("{:?}", e),
        })?;

        let sender: WsSender = Rc::new(RefCell::new(None));
        let retired = Rc::new(Cell::new(false));
        spawn_local(run_socket(
            ws,
            sender.clone(),
            retired.clone(),
            self.on_event.clone(),
        ));

        Ok(WsChannel { sender, retired })
    }
}

async fn run_socket(
    mut ws: WebSocket,
    sender: WsSender,
    retired: Rc<Cell<bool>>,
    on_event: Callback<ChannelEvent>,
) {
    let emit = |event: ChannelEvent| {
        if !retired.get() {
            on_event.emit(event);
        }
    };

    // The sink only becomes ready once the handshake completes
    let ready = poll_fn(|cx| Pin::new(&mut ws).poll_ready(cx)).await;
    if let Err(e) = ready {
        log::warn!("WebSocket failed to open: {:?}", e);
        emit(ChannelEvent::Closed);
        return;
    }
    if !matches!(ws.state(), State::Open) {
        emit(ChannelEvent::Closed);
        return;
    }

    let (sink, mut receiver) = ws.split();
    *sender.borrow_mut() = Some(sink);
    emit(ChannelEvent::Opened);

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => emit(ChannelEvent::Frame(Frame::Text(text))),
            Ok(Message::Bytes(bytes)) => emit(ChannelEvent::Frame(Frame::Binary(bytes))),
            Err(e) => {
                log::info!("WebSocket closed: {:?}", e);
                break;
            }
        }
    }

    sender.borrow_mut().take();
    emit(ChannelEvent::Closed);
}
