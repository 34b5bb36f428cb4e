/// localStorage key holding the browser's client identifier.
pub const CLIENT_ID_STORAGE_KEY: &str = "fitbotClientId";

/// Display name the backend prefixes some replies with ("FitBot: ...").
pub const BOT_NAME: &str = "FitBot";

/// Path prefix of the chat socket; the client id is appended as one segment.
pub const WS_PATH_PREFIX: &str = "/ws";

/// Liveness endpoint polled for model availability.
pub const HEALTH_PATH: &str = "/health";

/// Seconds between health polls.
pub const HEALTH_POLL_INTERVAL_SECS: u64 = 30;

/// First reconnect delay in milliseconds.
pub const RECONNECT_INITIAL_MS: u64 = 500;

/// Upper bound on the reconnect delay in milliseconds.
pub const RECONNECT_MAX_MS: u64 = 30_000;

/// Distance from the bottom (in CSS pixels) still counted as "at the bottom".
pub const SCROLL_BOTTOM_THRESHOLD_PX: i32 = 80;

/// Longest message the backend accepts before replying with a complaint.
pub const MAX_MESSAGE_CHARS: usize = 4000;
