//! Classification of raw socket text and cleanup of displayed content.

use crate::ServerMessage;

/// What a received frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// One of the known structured frames
    Structured(ServerMessage),
    /// Valid JSON that is not a known frame; carries the trimmed raw text
    Unrecognized(String),
    /// Not JSON at all; carries the original text
    PlainText(String),
}

/// Trim and parse a frame. Never fails: anything that is not a known frame
/// degrades to text the client can show.
pub fn parse_inbound(text: &str) -> Inbound {
    let raw = text.trim();
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => match serde_json::from_value::<ServerMessage>(value) {
            Ok(msg) => Inbound::Structured(msg),
            Err(_) => Inbound::Unrecognized(raw.to_string()),
        },
        Err(_) => Inbound::PlainText(text.to_string()),
    }
}

/// Collapse CRLF, lone CR and their backslash-escaped spellings (`\r\n`,
/// `\r`, `\n`) into a real `\n`. Idempotent.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\\' => match chars.peek() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('r') => {
                    chars.next();
                    // An escaped CR may be followed by an escaped or real LF
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('n') {
                        chars.next();
                        chars.next();
                    } else {
                        chars.next_if_eq(&'\n');
                    }
                    out.push('\n');
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    out
}

/// Drop a leading "`<bot name>:`" and the whitespace after it.
pub fn strip_bot_prefix<'a>(text: &'a str, bot_name: &str) -> &'a str {
    text.strip_prefix(bot_name)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(str::trim_start)
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_frame_is_structured() {
        let parsed = parse_inbound("  {\"type\":\"stream\",\"delta\":\"Hi\"}\n");
        assert_eq!(
            parsed,
            Inbound::Structured(ServerMessage::Stream {
                delta: "Hi".to_string()
            })
        );
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        let parsed = parse_inbound(" {\"type\":\"ping\"} ");
        assert_eq!(parsed, Inbound::Unrecognized("{\"type\":\"ping\"}".to_string()));
    }

    #[test]
    fn json_scalar_is_unrecognized() {
        assert_eq!(parse_inbound("42"), Inbound::Unrecognized("42".to_string()));
    }

    #[test]
    fn non_json_is_plain_text() {
        let parsed = parse_inbound("FitBot: Tu mensaje es muy largo.");
        assert_eq!(
            parsed,
            Inbound::PlainText("FitBot: Tu mensaje es muy largo.".to_string())
        );
    }

    #[test]
    fn normalizes_real_and_escaped_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines(r"a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("a\\r\nb"), "a\nb");
        assert_eq!(normalize_newlines(r"path\to"), r"path\to");
        assert_eq!(normalize_newlines("trailing\\"), "trailing\\");
    }

    #[test]
    fn normalization_leaves_no_carriage_returns() {
        let inputs = [
            "x\r\r\n\r",
            r"\r\r\n\n\\n",
            "\\\r\n",
            "\\\\n\\\\r",
            "mixed \\r\n and \r\n and \\n",
        ];
        for input in inputs {
            let once = normalize_newlines(input);
            assert!(!once.contains('\r'), "{:?}", input);
            assert!(!once.contains("\\n") && !once.contains("\\r"), "{:?}", input);
            assert_eq!(normalize_newlines(&once), once, "{:?}", input);
        }
    }

    #[test]
    fn strips_bot_prefix() {
        assert_eq!(strip_bot_prefix("FitBot:   hola", "FitBot"), "hola");
        assert_eq!(strip_bot_prefix("FitBot:hola", "FitBot"), "hola");
        assert_eq!(strip_bot_prefix("Hola FitBot: x", "FitBot"), "Hola FitBot: x");
        assert_eq!(strip_bot_prefix("FitBot hola", "FitBot"), "FitBot hola");
    }
}
