//! Slash commands understood by the chat backend.
//!
//! Commands travel over the socket as ordinary text; this module only lets
//! the client recognise them. `/reset` is the one the client treats
//! specially (it clears the local pane after asking for confirmation).

/// Sentinel text asking the backend to wipe the conversation.
pub const RESET_COMMAND: &str = "/reset";

/// Records a workout entry: `/log <activity>`.
pub const LOG_COMMAND: &str = "/log";

/// Lists the most recent workout entries.
pub const HISTORY_COMMAND: &str = "/history";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    /// Clear the stored conversation
    Reset,
    /// Record a workout; `None` when no entry followed the command
    LogWorkout(Option<&'a str>),
    /// Show recent workouts
    WorkoutHistory,
    /// Plain chat text
    Text(&'a str),
}

impl<'a> ChatCommand<'a> {
    /// Classify already-trimmed input.
    pub fn parse(input: &'a str) -> Self {
        if input == RESET_COMMAND {
            return ChatCommand::Reset;
        }
        if input == HISTORY_COMMAND {
            return ChatCommand::WorkoutHistory;
        }
        if input == LOG_COMMAND {
            return ChatCommand::LogWorkout(None);
        }
        if let Some(rest) = input.strip_prefix(LOG_COMMAND) {
            if rest.starts_with(char::is_whitespace) {
                let entry = rest.trim();
                return ChatCommand::LogWorkout((!entry.is_empty()).then_some(entry));
            }
        }
        ChatCommand::Text(input)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, ChatCommand::Reset)
    }
}
