//! Core chat session state machine

use std::fmt;
use std::time::Duration;

use shared::{
    normalize_newlines, parse_inbound, strip_bot_prefix, ChatCommand, ClientId, EndpointError,
    HealthResponse, Inbound, Role, ServerMessage,
};
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::channel::{Channel, Connector, Frame};
use crate::render::MessageRenderer;
use crate::scroll::{ScrollTracker, Viewport};
use crate::transcript::{BubbleBody, BubbleId, Transcript, TranscriptEvent};

/// Where and as whom the session connects
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: ClientId,
    /// Fully built socket URL (`ws[s]://host/ws/<client id>`)
    pub endpoint: String,
    /// Prefix stripped from bot replies ("FitBot: ...")
    pub bot_name: String,
}

impl SessionConfig {
    /// Derive the socket endpoint from a page or server origin.
    pub fn new(origin: &str, client_id: ClientId) -> Result<Self, EndpointError> {
        let endpoint = shared::ws_endpoint(origin, &client_id)?.to_string();
        Ok(Self {
            client_id,
            endpoint,
            bot_name: shared::protocol::BOT_NAME.to_string(),
        })
    }
}

/// Lifecycle of the single channel the session owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Connection part of the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No channel has opened yet
    Connecting,
    Online,
    /// A channel was lost; a reconnect is pending or in flight
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusIndicator {
    pub connection: ConnectionStatus,
    /// Last value reported by the health endpoint, `None` before the first
    /// successful poll
    pub ai_available: Option<bool>,
}

impl StatusIndicator {
    pub fn label(&self) -> String {
        match (self.connection, self.ai_available) {
            (ConnectionStatus::Connecting, _) => "Connecting…".to_string(),
            (ConnectionStatus::Reconnecting, _) => "Reconnecting…".to_string(),
            (ConnectionStatus::Online, Some(true)) => "Online · AI available".to_string(),
            (ConnectionStatus::Online, Some(false)) => "Online · AI unavailable".to_string(),
            (ConnectionStatus::Online, None) => "Online".to_string(),
        }
    }
}

/// Result of asking the session to open a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The channel was created; wait for `on_open` or `on_close`
    Connecting,
    /// Construction failed; call `connect` again after the delay
    RetryAfter(Duration),
}

/// Why an input was dropped without sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Empty,
    NotOpen,
    AwaitingReply,
    SendFailed,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::Empty => "empty input",
            IgnoreReason::NotOpen => "not connected",
            IgnoreReason::AwaitingReply => "waiting for a reply",
            IgnoreReason::SendFailed => "send failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The input was the reset command; ask the user, then call
    /// `confirm_reset`
    NeedsConfirmation,
    Ignored(IgnoreReason),
}

/// Deltas of the reply currently being streamed
#[derive(Debug)]
struct StreamAccumulator {
    buffer: String,
    bubble: BubbleId,
}

/// The chat session client.
///
/// Owns the channel, the transcript and every piece of UI state derived from
/// the conversation. Hosts feed it socket and user events and read state back
/// out; it performs no I/O of its own beyond `Channel::send_text`.
pub struct ChatSession<C: Channel, R: MessageRenderer> {
    config: SessionConfig,
    renderer: R,
    state: ConnectionState,
    channel: Option<C>,
    backoff: Backoff,
    reconnect_scheduled: bool,
    status: StatusIndicator,
    transcript: Transcript,
    stream: Option<StreamAccumulator>,
    awaiting_reply: bool,
    typing: bool,
    scroll: ScrollTracker,
}

impl<C: Channel, R: MessageRenderer> ChatSession<C, R> {
    pub fn new(config: SessionConfig, renderer: R) -> Self {
        Self {
            config,
            renderer,
            state: ConnectionState::Disconnected,
            channel: None,
            backoff: Backoff::new(),
            reconnect_scheduled: false,
            status: StatusIndicator {
                connection: ConnectionStatus::Connecting,
                ai_available: None,
            },
            transcript: Transcript::new(),
            stream: None,
            awaiting_reply: false,
            typing: false,
            scroll: ScrollTracker::new(),
        }
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// DISCONNECTED -> CONNECTING. Replaces any channel still held.
    pub fn connect<K>(&mut self, connector: &mut K) -> ConnectOutcome
    where
        K: Connector<Channel = C>,
    {
        if let Some(mut old) = self.channel.take() {
            debug!("Replacing existing channel before reconnecting");
            old.close();
        }
        self.reconnect_scheduled = false;
        self.state = ConnectionState::Connecting;

        info!(
            "Connecting to {} (attempt {})",
            self.config.endpoint,
            self.backoff.attempt()
        );
        match connector.open(&self.config.endpoint) {
            Ok(channel) => {
                self.channel = Some(channel);
                ConnectOutcome::Connecting
            }
            Err(e) => {
                warn!("Failed to create channel: {}", e);
                self.state = ConnectionState::Disconnected;
                ConnectOutcome::RetryAfter(self.schedule_reconnect())
            }
        }
    }

    /// CONNECTING -> OPEN. Input is enabled straight away: `on_close`
    /// drops any pending reply, so none can be outstanding here.
    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("Ignoring open event in state {:?}", self.state);
            return;
        }
        info!("Chat channel open");
        self.state = ConnectionState::Open;
        self.backoff.reset();
        self.status.connection = ConnectionStatus::Online;
    }

    /// Any state -> DISCONNECTED. Returns the delay before the next
    /// `connect`, or `None` if a reconnect is already scheduled.
    pub fn on_close(&mut self) -> Option<Duration> {
        if self.state == ConnectionState::Disconnected && self.reconnect_scheduled {
            debug!("Duplicate close ignored, reconnect already scheduled");
            return None;
        }

        info!("Chat channel closed (was {:?})", self.state);
        self.channel = None;
        self.state = ConnectionState::Disconnected;
        self.status.connection = ConnectionStatus::Reconnecting;
        self.typing = false;
        // The pending reply was bound to the lost socket; it will not arrive
        self.awaiting_reply = false;
        if let Some(stream) = self.stream.take() {
            debug!("Dropping in-flight stream of {} bytes", stream.buffer.len());
            self.transcript.abandon_stream(stream.bubble);
        }

        Some(self.schedule_reconnect())
    }

    fn schedule_reconnect(&mut self) -> Duration {
        let delay = self.backoff.next_delay();
        self.reconnect_scheduled = true;
        info!(
            "Reconnecting in {}ms (attempt {})",
            delay.as_millis(),
            self.backoff.attempt()
        );
        delay
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Handle one received payload.
    pub fn on_frame(&mut self, frame: Frame) {
        let text = frame.into_text();
        self.typing = false;

        match parse_inbound(&text) {
            Inbound::Structured(msg) => self.dispatch(msg),
            Inbound::Unrecognized(raw) => {
                debug!("Unrecognized frame shown verbatim: {}", raw);
                self.append_resolved(Role::Bot, &raw);
            }
            Inbound::PlainText(raw) => {
                self.append_resolved(Role::Bot, &raw);
                self.reply_complete();
            }
        }
    }

    fn dispatch(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::History { messages } => {
                debug!("Replaying {} history messages", messages.len());
                self.stream = None;
                self.transcript.clear();
                for message in messages {
                    self.append_resolved(message.role, &message.content);
                }
            }
            ServerMessage::Stream { delta } => self.append_delta(&delta),
            ServerMessage::StreamEnd { content } => self.finish_stream(&content),
            ServerMessage::Message { role, content } => {
                self.append_resolved(role, &content);
                if role.is_bot() {
                    self.reply_complete();
                }
            }
        }
    }

    fn append_resolved(&mut self, role: Role, content: &str) -> BubbleId {
        let text = normalize_newlines(content);
        let body = match role {
            Role::User => BubbleBody::Text(text),
            Role::Bot => BubbleBody::Markup(self.render_bot(&text)),
        };
        self.scroll.before_append();
        self.transcript.push(role, body)
    }

    fn append_delta(&mut self, delta: &str) {
        let delta = normalize_newlines(delta);
        if self.stream.is_none() {
            self.scroll.before_append();
            let bubble = self.transcript.push_streaming();
            self.stream = Some(StreamAccumulator {
                buffer: String::new(),
                bubble,
            });
        }
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        stream.buffer.push_str(&delta);
        self.transcript
            .update_stream(stream.bubble, &stream.buffer, &delta);
    }

    fn finish_stream(&mut self, content: &str) {
        let bubble = match self.stream.take() {
            Some(stream) => stream.bubble,
            None => {
                self.scroll.before_append();
                self.transcript.push_streaming()
            }
        };
        let markup = self.render_bot(&normalize_newlines(content));
        self.transcript.finalize(bubble, BubbleBody::Markup(markup));
        self.reply_complete();
    }

    fn render_bot(&self, text: &str) -> String {
        let text = strip_bot_prefix(text, &self.config.bot_name);
        self.renderer
            .sanitize(&self.renderer.render_markdown(text))
    }

    fn reply_complete(&mut self) {
        self.awaiting_reply = false;
        self.typing = false;
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Send the user's input. Empty input, or input while the channel is not
    /// open, is dropped silently.
    pub fn send_input(&mut self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::Empty);
        }
        if self.state != ConnectionState::Open {
            debug!("Dropping input while {:?}", self.state);
            return SendOutcome::Ignored(IgnoreReason::NotOpen);
        }
        if self.awaiting_reply {
            return SendOutcome::Ignored(IgnoreReason::AwaitingReply);
        }
        if ChatCommand::parse(text).is_reset() {
            return SendOutcome::NeedsConfirmation;
        }

        if let Err(reason) = self.transmit(text) {
            return SendOutcome::Ignored(reason);
        }
        self.append_resolved(Role::User, text);
        SendOutcome::Sent
    }

    /// The user confirmed the reset: send the command, then clear the pane.
    /// A failed send leaves the conversation on screen.
    pub fn confirm_reset(&mut self) -> SendOutcome {
        if self.state != ConnectionState::Open {
            return SendOutcome::Ignored(IgnoreReason::NotOpen);
        }
        if let Err(reason) = self.transmit(shared::commands::RESET_COMMAND) {
            return SendOutcome::Ignored(reason);
        }
        self.stream = None;
        self.transcript.clear();
        SendOutcome::Sent
    }

    fn transmit(&mut self, text: &str) -> Result<(), IgnoreReason> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(IgnoreReason::NotOpen);
        };
        if let Err(e) = channel.send_text(text) {
            warn!("Failed to send message: {}", e);
            return Err(IgnoreReason::SendFailed);
        }
        self.typing = true;
        self.awaiting_reply = true;
        Ok(())
    }

    // =========================================================================
    // Health and scrolling
    // =========================================================================

    /// Record a successful health poll. Failed polls are simply not reported.
    pub fn apply_health(&mut self, health: &HealthResponse) {
        if self.status.ai_available != Some(health.lm_client_available) {
            info!("AI available: {}", health.lm_client_available);
        }
        self.status.ai_available = Some(health.lm_client_available);
    }

    pub fn observe_viewport(&mut self, viewport: Viewport) {
        self.scroll.observe(viewport);
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll.jump_to_bottom();
    }

    pub fn take_scroll_request(&mut self) -> bool {
        self.scroll.take_scroll_request()
    }

    pub fn jump_visible(&self) -> bool {
        self.scroll.jump_visible()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> StatusIndicator {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Input is usable only while connected and no reply is pending.
    pub fn input_enabled(&self) -> bool {
        self.is_connected() && !self.awaiting_reply
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn drain_transcript_events(&mut self) -> Vec<TranscriptEvent> {
        self.transcript.drain_events()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
