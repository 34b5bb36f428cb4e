//! Transport seams between the session and the host's socket.
//!
//! Hosts implement [`Connector`] to start opening a socket and hand back a
//! [`Channel`] for outbound text. Everything that happens afterwards on the
//! socket (opened, frame received, closed) is reported back to the session
//! through `ChatSession::on_open`, `on_frame` and `on_close`.

use crate::error::ChannelError;

/// Outbound half of a live socket.
pub trait Channel {
    /// Queue text for delivery. Buffering is left to the transport.
    fn send_text(&mut self, text: &str) -> Result<(), ChannelError>;

    /// Ask the transport to shut down. Hosts still report the resulting
    /// close through `ChatSession::on_close`.
    fn close(&mut self) {}
}

/// Starts opening a socket.
///
/// Returning `Err` models a construction failure (bad URL, refused by the
/// platform). A socket that is created but never opens is reported later as
/// an ordinary close.
pub trait Connector {
    type Channel: Channel;

    fn open(&mut self, url: &str) -> Result<Self::Channel, ChannelError>;
}

/// A payload received from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Coerce to text; binary payloads are decoded as UTF-8 with replacement.
    pub fn into_text(self) -> String {
        match self {
            Frame::Text(text) => text,
            Frame::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frames_decode_as_utf8() {
        let frame = Frame::Binary("¡Hola!".as_bytes().to_vec());
        assert_eq!(frame.into_text(), "¡Hola!");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let frame = Frame::Binary(vec![b'o', b'k', 0xff]);
        assert_eq!(frame.into_text(), "ok\u{fffd}");
    }
}
