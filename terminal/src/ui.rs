//! Terminal UI helpers for the chat client.

use std::collections::HashSet;
use std::io::Write;

use chat_session_lib::{
    BubbleBody, BubbleId, Channel, ChatSession, ConnectionStatus, MessageRenderer,
    StatusIndicator, Transcript, TranscriptEvent,
};
use colored::Colorize;
use shared::Role;

use crate::render::strip_control;

/// Print the startup banner
pub fn print_startup_banner() {
    println!();
    println!(
        "{}",
        "╭──────────────────────────────────────╮".bright_magenta()
    );
    println!(
        "{}",
        "│             FitBot Chat              │".bright_magenta()
    );
    println!(
        "{}",
        "╰──────────────────────────────────────╯".bright_magenta()
    );
    println!();
}

/// Print connection information
pub fn print_session_info(server_url: &str, client_id: &str) {
    println!("  {} {}", "Server:".dimmed(), server_url.bright_white());
    println!("  {} {}", "Client:".dimmed(), client_id.bright_cyan());
    println!();
    println!(
        "  Commands: {} {} {} {}",
        "/log <entry>".bright_cyan(),
        "/history".bright_cyan(),
        "/reset".bright_cyan(),
        "/quit".bright_cyan()
    );
    println!();
}

pub fn print_help() {
    println!("  {}  record a workout", "/log <entry>".bright_cyan());
    println!("  {}      list recent workouts", "/history".bright_cyan());
    println!("  {}        clear the conversation", "/reset".bright_cyan());
    println!("  {}         leave", "/quit".bright_cyan());
}

/// Print a dimmed hint (refused input and the like)
pub fn print_hint(message: &str) {
    println!("  {} {}", "·".dimmed(), message.dimmed());
}

pub fn print_info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

pub fn print_reset_prompt() {
    print!(
        "  {} Clear the whole conversation? {} ",
        "⚠".bright_yellow(),
        "[y/N]".bright_white()
    );
    let _ = std::io::stdout().flush();
}

pub fn print_forgot(client_id: &str) {
    println!("{} Forgot client id {}", "✓".bright_green(), client_id);
}

pub fn print_nothing_to_forget() {
    println!("No stored client id");
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "See you next workout.".bright_magenta());
}

fn print_status(status: &StatusIndicator) {
    let dot = match (status.connection, status.ai_available) {
        (ConnectionStatus::Online, Some(false)) => "●".bright_yellow(),
        (ConnectionStatus::Online, _) => "●".bright_green(),
        (ConnectionStatus::Connecting, _) => "●".bright_blue(),
        (ConnectionStatus::Reconnecting, _) => "●".bright_red(),
    };
    println!("  {} {}", dot, status.label().dimmed());
}

fn role_tag(role: Role, bot_name: &str) -> String {
    match role {
        Role::User => "🧑 You".bright_cyan().bold().to_string(),
        Role::Bot => format!("🤖 {}", bot_name).bright_magenta().bold().to_string(),
    }
}

fn gutter(role: Role) -> String {
    match role {
        Role::User => "│".bright_cyan().to_string(),
        Role::Bot => "│".bright_magenta().to_string(),
    }
}

fn print_body(role: Role, body: &BubbleBody) {
    let text = match body {
        BubbleBody::Markup(markup) => markup.clone(),
        BubbleBody::Text(text) => strip_control(text),
    };
    let gutter = gutter(role);
    for line in text.lines() {
        println!("{} {}", gutter, line);
    }
}

/// Stream currently being printed live
struct OpenStream {
    id: BubbleId,
    printed_delta: bool,
}

/// Prints transcript changes as they happen.
///
/// The terminal cannot redraw, so after the transcript is cleared and
/// replayed (history on reconnect) bubbles already on screen are skipped,
/// in order, until one turns up that was never printed.
pub struct TranscriptPrinter {
    bot_name: String,
    printed: Vec<(Role, String)>,
    replay: Option<(Vec<(Role, String)>, usize)>,
    echoed: HashSet<BubbleId>,
    stream: Option<OpenStream>,
    typing_shown: bool,
    last_status: Option<StatusIndicator>,
}

impl TranscriptPrinter {
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            printed: Vec::new(),
            replay: None,
            echoed: HashSet::new(),
            stream: None,
            typing_shown: false,
            last_status: None,
        }
    }

    /// The user's own input is already on screen
    pub fn mark_echoed(&mut self, id: BubbleId) {
        self.echoed.insert(id);
    }

    /// Forget the screen contents so nothing is skipped as a replay
    pub fn forget_printed(&mut self) {
        self.printed.clear();
        self.replay = None;
    }

    /// Print everything that changed since the last call.
    pub fn render<C: Channel, R: MessageRenderer>(&mut self, session: &mut ChatSession<C, R>) {
        let events = session.drain_transcript_events();
        let typing = session.is_typing();

        if self.typing_shown && (!events.is_empty() || !typing) {
            print!("\r\x1b[2K");
            self.typing_shown = false;
        }

        for event in events {
            self.apply(session.transcript(), event);
        }

        // A stream dropped by a disconnect or a history replay never finalizes
        if !session.is_streaming() {
            if let Some(stream) = self.stream.take() {
                println!();
                if let Some(bubble) = session.transcript().get(stream.id) {
                    self.printed
                        .push((bubble.role, bubble.body.as_str().to_string()));
                }
            }
        }

        let status = session.status();
        if self.last_status != Some(status) {
            print_status(&status);
            self.last_status = Some(status);
        }

        if typing && !self.typing_shown {
            print!("  {}", format!("{} is typing…", self.bot_name).dimmed());
            self.typing_shown = true;
        }

        let _ = std::io::stdout().flush();
    }

    fn apply(&mut self, transcript: &Transcript, event: TranscriptEvent) {
        match event {
            TranscriptEvent::Appended(id) => {
                let Some(bubble) = transcript.get(id) else {
                    return;
                };
                let entry = (bubble.role, bubble.body.as_str().to_string());

                if bubble.streaming {
                    self.replay = None;
                    println!("{}", role_tag(Role::Bot, &self.bot_name));
                    print!("{} ", gutter(Role::Bot));
                    self.stream = Some(OpenStream {
                        id,
                        printed_delta: false,
                    });
                    return;
                }

                if !self.echoed.remove(&id) && !self.is_replayed(&entry) {
                    println!("{}", role_tag(bubble.role, &self.bot_name));
                    print_body(bubble.role, &bubble.body);
                }
                self.printed.push(entry);
            }
            TranscriptEvent::Delta { id, text } => {
                if let Some(stream) = self.stream.as_mut().filter(|s| s.id == id) {
                    let text = strip_control(&text)
                        .replace('\n', &format!("\n{} ", gutter(Role::Bot)));
                    print!("{}", text);
                    stream.printed_delta = true;
                }
            }
            TranscriptEvent::Finalized(id) => {
                let Some(bubble) = transcript.get(id) else {
                    return;
                };
                match self.stream.take() {
                    Some(stream) if stream.id == id && stream.printed_delta => println!(),
                    Some(stream) if stream.id == id => {
                        // Nothing streamed; show the rendered reply instead
                        print!("\r");
                        print_body(bubble.role, &bubble.body);
                    }
                    other => {
                        self.stream = other;
                        println!("{}", role_tag(bubble.role, &self.bot_name));
                        print_body(bubble.role, &bubble.body);
                    }
                }
                self.printed
                    .push((bubble.role, bubble.body.as_str().to_string()));
            }
            TranscriptEvent::Cleared => {
                if self.stream.take().is_some() {
                    println!();
                }
                self.replay = Some((std::mem::take(&mut self.printed), 0));
            }
        }
    }

    /// Match `entry` against what was on screen before the clear. Entries
    /// the history never carries (welcome messages, bubbles beyond the
    /// history limit) are skipped over.
    fn is_replayed(&mut self, entry: &(Role, String)) -> bool {
        if let Some((previous, cursor)) = self.replay.as_mut() {
            if let Some(offset) = previous[*cursor..].iter().position(|p| p == entry) {
                *cursor += offset + 1;
                return true;
            }
            self.replay = None;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::AnsiRenderer;
    use chat_session_lib::{ChannelError, Connector, Frame, SessionConfig};
    use shared::ClientId;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Sent = Rc<RefCell<Vec<String>>>;

    struct FakeChannel(Sent);

    impl Channel for FakeChannel {
        fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct FakeConnector(Sent);

    impl Connector for FakeConnector {
        type Channel = FakeChannel;

        fn open(&mut self, _url: &str) -> Result<FakeChannel, ChannelError> {
            Ok(FakeChannel(self.0.clone()))
        }
    }

    type Session = ChatSession<FakeChannel, AnsiRenderer>;

    const WELCOME: &str =
        r#"{"type":"message","role":"assistant","content":"¡Hola! Soy FitBot, tu entrenador."}"#;

    fn connected() -> (Session, FakeConnector) {
        // Rendered markup must not change if another test flips colouring
        colored::control::set_override(true);
        let config = SessionConfig::new(
            "http://127.0.0.1:8000",
            ClientId::from_stored("abc123".to_string()),
        )
        .unwrap();
        let mut session = ChatSession::new(config, AnsiRenderer::new());
        let mut connector = FakeConnector(Rc::default());
        session.connect(&mut connector);
        session.on_open();
        (session, connector)
    }

    fn frame(json: &str) -> Frame {
        Frame::Text(json.to_string())
    }

    fn reconnect(session: &mut Session, connector: &mut FakeConnector) {
        assert!(session.on_close().is_some());
        session.connect(connector);
        session.on_open();
    }

    fn on_screen(session: &Session) -> Vec<(Role, String)> {
        session
            .transcript()
            .bubbles()
            .iter()
            .map(|b| (b.role, b.body.as_str().to_string()))
            .collect()
    }

    /// Send `text` the way the chat loop does, echo suppression included.
    fn send(session: &mut Session, printer: &mut TranscriptPrinter, text: &str) {
        session.send_input(text);
        let id = session.transcript().bubbles().last().unwrap().id;
        printer.mark_echoed(id);
        printer.render(session);
    }

    fn stream_reply(session: &mut Session, printer: &mut TranscriptPrinter, parts: &[&str]) {
        for part in parts {
            session.on_frame(frame(&format!(r#"{{"type":"stream","delta":"{}"}}"#, part)));
            printer.render(session);
        }
        session.on_frame(frame(&format!(
            r#"{{"type":"stream_end","content":"{}"}}"#,
            parts.concat()
        )));
        printer.render(session);
    }

    #[test]
    fn echoed_input_is_recorded_once() {
        let (mut session, _connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");
        printer.render(&mut session);

        send(&mut session, &mut printer, "u1");

        assert!(printer.echoed.is_empty());
        assert_eq!(printer.printed, vec![(Role::User, "u1".to_string())]);
    }

    #[test]
    fn streamed_reply_is_closed_on_stream_end() {
        let (mut session, _connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");
        send(&mut session, &mut printer, "u1");

        session.on_frame(frame(r#"{"type":"stream","delta":"Hel"}"#));
        printer.render(&mut session);
        assert!(printer.stream.as_ref().is_some_and(|s| s.printed_delta));
        assert_eq!(printer.printed.len(), 1);

        session.on_frame(frame(r#"{"type":"stream_end","content":"Hello"}"#));
        printer.render(&mut session);
        assert!(printer.stream.is_none());
        assert_eq!(printer.printed, on_screen(&session));
        assert_eq!(printer.printed[1].0, Role::Bot);
    }

    #[test]
    fn abandoned_stream_is_flushed_on_close() {
        let (mut session, _connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");

        session.on_frame(frame(r#"{"type":"stream","delta":"a medias"}"#));
        printer.render(&mut session);
        assert!(printer.stream.is_some());

        session.on_close();
        printer.render(&mut session);
        assert!(printer.stream.is_none());
        assert_eq!(printer.printed, vec![(Role::Bot, "a medias".to_string())]);
    }

    #[test]
    fn history_after_reconnect_skips_welcome_and_known_bubbles() {
        let (mut session, mut connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");

        session.on_frame(frame(WELCOME));
        printer.render(&mut session);
        send(&mut session, &mut printer, "u1");
        stream_reply(&mut session, &mut printer, &["b", "1"]);
        assert_eq!(printer.printed.len(), 3);

        reconnect(&mut session, &mut connector);
        session.on_frame(frame(
            r#"{"type":"history","messages":[{"role":"user","content":"u1"},{"role":"assistant","content":"b1"}]}"#,
        ));
        printer.render(&mut session);

        let (_, cursor) = printer.replay.as_ref().expect("replay still active");
        assert_eq!(*cursor, 3);
        assert_eq!(printer.printed, on_screen(&session));

        // The fresh welcome was never part of the history, so it prints
        session.on_frame(frame(WELCOME));
        printer.render(&mut session);
        assert!(printer.replay.is_none());
        assert_eq!(printer.printed.len(), 3);
    }

    #[test]
    fn unknown_history_ends_replay() {
        let (mut session, mut connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");
        send(&mut session, &mut printer, "u1");
        session.on_frame(frame(r#"{"type":"message","role":"assistant","content":"b1"}"#));
        printer.render(&mut session);

        reconnect(&mut session, &mut connector);
        session.on_frame(frame(
            r#"{"type":"history","messages":[{"role":"user","content":"otra cosa"}]}"#,
        ));
        printer.render(&mut session);

        assert!(printer.replay.is_none());
        assert_eq!(printer.printed, on_screen(&session));
    }

    #[test]
    fn forgetting_disables_replay_matching() {
        let (mut session, _connector) = connected();
        let mut printer = TranscriptPrinter::new("FitBot");
        send(&mut session, &mut printer, "u1");

        printer.forget_printed();
        assert!(printer.printed.is_empty());
        assert!(printer.replay.is_none());
    }
}
