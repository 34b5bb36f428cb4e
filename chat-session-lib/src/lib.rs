//! FitBot chat session library
//!
//! Transport-agnostic client logic for the FitBot chat widget: connection
//! lifecycle with exponential reconnect, the streaming reply protocol,
//! outbound commands, the rendered transcript and auto-scroll bookkeeping.
//!
//! # Overview
//!
//! The library provides:
//! - `ChatSession` - The state machine hosts feed socket and user events into
//! - `Channel` / `Connector` - Seams the host implements over its socket
//! - `MessageRenderer` - Injected markdown + sanitizer pair
//! - `Transcript` - The message pane as data, with change events
//!
//! # Example
//!
//! ```ignore
//! use chat_session_lib::{ChatSession, ConnectOutcome, Frame, HtmlRenderer, SessionConfig};
//! use shared::ClientId;
//!
//! let config = SessionConfig::new("https://fitbot.example", ClientId::from_stored(id))?;
//! let mut session = ChatSession::new(config, HtmlRenderer::new());
//!
//! match session.connect(&mut connector) {
//!     ConnectOutcome::Connecting => {}
//!     ConnectOutcome::RetryAfter(delay) => schedule(delay),
//! }
//!
//! // Later, from socket callbacks:
//! session.on_open();
//! session.on_frame(Frame::Text(text));
//! if let Some(delay) = session.on_close() {
//!     schedule(delay);
//! }
//! ```

pub mod backoff;
pub mod channel;
pub mod error;
pub mod render;
pub mod scroll;
pub mod session;
pub mod transcript;

pub use backoff::Backoff;
pub use channel::{Channel, Connector, Frame};
pub use error::ChannelError;
#[cfg(feature = "html")]
pub use render::HtmlRenderer;
pub use render::{FnRenderer, MessageRenderer};
pub use scroll::{ScrollTracker, Viewport};
pub use session::{
    ChatSession, ConnectOutcome, ConnectionState, ConnectionStatus, IgnoreReason, SendOutcome,
    SessionConfig, StatusIndicator,
};
pub use transcript::{Bubble, BubbleBody, BubbleId, Transcript, TranscriptEvent};
