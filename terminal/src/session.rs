//! Chat loop: socket events, stdin, reconnect timer and health polling.

use std::time::Duration;

use anyhow::{Context, Result};
use chat_session_lib::{
    ChatSession, ConnectOutcome, IgnoreReason, SendOutcome, SessionConfig,
};
use shared::protocol::{HEALTH_POLL_INTERVAL_SECS, MAX_MESSAGE_CHARS};
use shared::{ChatCommand, HealthResponse};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::health::fetch_health;
use crate::render::AnsiRenderer;
use crate::socket::{SocketEvent, SocketEventKind, TerminalChannel, TerminalConnector};
use crate::ui::{self, TranscriptPrinter};

type Session = ChatSession<TerminalChannel, AnsiRenderer>;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do after handling one line of input
#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Continue,
    Quit,
}

/// Run the chat until the user quits, stdin closes or Ctrl+C.
pub async fn run_chat(config: SessionConfig, health_url: String) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SocketEvent>();
    let (health_tx, mut health_rx) = mpsc::unbounded_channel::<HealthResponse>();

    let mut connector = TerminalConnector::new(event_tx);
    let mut printer = TranscriptPrinter::new(&config.bot_name);
    let mut session: Session = ChatSession::new(config, AnsiRenderer::new());
    let mut lines = spawn_stdin_reader();

    let http = reqwest::Client::builder()
        .timeout(HEALTH_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let mut health_timer = tokio::time::interval(Duration::from_secs(HEALTH_POLL_INTERVAL_SECS));

    let mut reconnect_at = start_connect(&mut session, &mut connector);
    let mut pending_reset = false;
    printer.render(&mut session);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if !connector.is_current(event.generation) {
                    debug!("Ignoring event from replaced socket {}", event.generation);
                    continue;
                }
                match event.kind {
                    SocketEventKind::Opened => session.on_open(),
                    SocketEventKind::Frame(frame) => session.on_frame(frame),
                    SocketEventKind::Closed => {
                        if let Some(delay) = session.on_close() {
                            reconnect_at = Some(Instant::now() + delay);
                        }
                    }
                }
            }

            line = lines.recv() => {
                let Some(line) = line else {
                    info!("stdin closed");
                    break;
                };
                let action = handle_line(&mut session, &mut printer, &mut pending_reset, &line);
                if action == LineAction::Quit {
                    break;
                }
            }

            _ = wait_until(reconnect_at) => {
                reconnect_at = start_connect(&mut session, &mut connector);
            }

            _ = health_timer.tick() => {
                let http = http.clone();
                let url = health_url.clone();
                let health_tx = health_tx.clone();
                tokio::spawn(async move {
                    match fetch_health(&http, &url).await {
                        Ok(health) => {
                            let _ = health_tx.send(health);
                        }
                        Err(e) => debug!("Health check failed: {:#}", e),
                    }
                });
            }

            Some(health) = health_rx.recv() => session.apply_health(&health),

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }

        printer.render(&mut session);
    }

    ui::print_goodbye();
    Ok(())
}

fn start_connect(session: &mut Session, connector: &mut TerminalConnector) -> Option<Instant> {
    match session.connect(connector) {
        ConnectOutcome::Connecting => None,
        ConnectOutcome::RetryAfter(delay) => Some(Instant::now() + delay),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Forward stdin lines to the loop; the channel closes on EOF.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn handle_line(
    session: &mut Session,
    printer: &mut TranscriptPrinter,
    pending_reset: &mut bool,
    line: &str,
) -> LineAction {
    let input = line.trim();

    if std::mem::take(pending_reset) {
        if is_yes(input) {
            match session.confirm_reset() {
                SendOutcome::Sent => {
                    printer.forget_printed();
                    ui::print_info("Conversation cleared");
                }
                SendOutcome::Ignored(reason) => ui::print_hint(&format!("Not reset: {}", reason)),
                SendOutcome::NeedsConfirmation => {}
            }
        } else {
            ui::print_hint("Reset cancelled");
        }
        return LineAction::Continue;
    }

    match input {
        "/quit" | "/exit" => return LineAction::Quit,
        "/help" => {
            ui::print_help();
            return LineAction::Continue;
        }
        _ => {}
    }

    // The backend only recognises `/log` followed by an entry
    if ChatCommand::parse(input) == ChatCommand::LogWorkout(None) {
        ui::print_hint("Usage: /log <activity>, e.g. /log pushups 3x10");
        return LineAction::Continue;
    }

    let length = input.chars().count();
    if length > MAX_MESSAGE_CHARS {
        ui::print_hint(&format!(
            "Message too long ({} characters, the limit is {})",
            length, MAX_MESSAGE_CHARS
        ));
        return LineAction::Continue;
    }

    match session.send_input(input) {
        SendOutcome::Sent => {
            if let Some(bubble) = session.transcript().bubbles().last() {
                printer.mark_echoed(bubble.id);
            }
        }
        SendOutcome::NeedsConfirmation => {
            *pending_reset = true;
            ui::print_reset_prompt();
        }
        SendOutcome::Ignored(IgnoreReason::Empty) => {}
        SendOutcome::Ignored(IgnoreReason::AwaitingReply) => {
            ui::print_hint("Still waiting for the last reply, message not sent");
        }
        SendOutcome::Ignored(reason) => {
            ui::print_hint(&format!("Message not sent: {}", reason));
        }
    }
    LineAction::Continue
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ClientId;

    fn offline_session() -> Session {
        let config = SessionConfig::new(
            "http://127.0.0.1:9",
            ClientId::from_stored("abc".to_string()),
        )
        .unwrap();
        ChatSession::new(config, AnsiRenderer::new())
    }

    #[test]
    fn answers_accepted_as_yes() {
        for answer in ["y", "Y", "yes", "sí", "si"] {
            assert!(is_yes(answer), "{answer}");
        }
        for answer in ["", "n", "no", "yes please"] {
            assert!(!is_yes(answer), "{answer}");
        }
    }

    #[test]
    fn quit_is_handled_locally() {
        let mut session = offline_session();
        let mut printer = TranscriptPrinter::new("FitBot");
        let mut pending = false;
        assert_eq!(
            handle_line(&mut session, &mut printer, &mut pending, " /quit "),
            LineAction::Quit
        );
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn reset_asks_before_sending() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = TerminalConnector::new(tx);
        let mut session = offline_session();
        let mut printer = TranscriptPrinter::new("FitBot");
        let mut pending = false;

        assert_eq!(session.connect(&mut connector), ConnectOutcome::Connecting);
        session.on_open();

        handle_line(&mut session, &mut printer, &mut pending, "/reset");
        assert!(pending);
        assert!(session.input_enabled());

        handle_line(&mut session, &mut printer, &mut pending, "n");
        assert!(!pending);
        assert!(session.input_enabled());
    }

    #[test]
    fn bare_log_shows_usage() {
        let mut session = offline_session();
        let mut printer = TranscriptPrinter::new("FitBot");
        let mut pending = false;
        assert_eq!(
            handle_line(&mut session, &mut printer, &mut pending, "/log"),
            LineAction::Continue
        );
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn overlong_input_is_not_sent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = TerminalConnector::new(tx);
        let mut session = offline_session();
        let mut printer = TranscriptPrinter::new("FitBot");
        let mut pending = false;
        session.connect(&mut connector);
        session.on_open();

        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        handle_line(&mut session, &mut printer, &mut pending, &long);
        assert!(session.transcript().is_empty());
        assert!(session.input_enabled());

        handle_line(&mut session, &mut printer, &mut pending, "hola");
        assert_eq!(session.transcript().len(), 1);
        assert!(!session.input_enabled());
    }
}
