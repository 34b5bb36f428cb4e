//! Error types for chat-session-lib

/// Errors a channel implementation can report to the session
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to open channel to {url}: {reason}")]
    OpenFailed { url: String, reason: String },

    #[error("Failed to send on channel: {0}")]
    SendFailed(String),

    #[error("Channel is closed")]
    Closed,

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] shared::EndpointError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChannelError::Closed;
        assert_eq!(format!("{}", err), "Channel is closed");

        let err = ChannelError::OpenFailed {
            url: "ws://localhost/ws/abc".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Failed to open channel to ws://localhost/ws/abc: refused"
        );

        let err = ChannelError::SendFailed("buffer full".to_string());
        assert_eq!(format!("{}", err), "Failed to send on channel: buffer full");
    }

    #[test]
    fn test_endpoint_error_converts() {
        let err: ChannelError = shared::EndpointError::UnsupportedScheme("ftp".to_string()).into();
        assert!(format!("{}", err).contains("ftp"));
    }
}
