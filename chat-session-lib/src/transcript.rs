//! The rendered message pane, as data.

use shared::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(u64);

impl BubbleId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// What a bubble displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BubbleBody {
    /// Shown as literal text, never interpreted as markup
    Text(String),
    /// Sanitized renderer output, safe to insert as markup
    Markup(String),
}

impl BubbleBody {
    pub fn as_str(&self) -> &str {
        match self {
            BubbleBody::Text(s) | BubbleBody::Markup(s) => s,
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, BubbleBody::Markup(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: BubbleId,
    pub role: Role,
    pub body: BubbleBody,
    /// True while the bubble is the target of an in-progress stream
    pub streaming: bool,
}

/// Change notifications for hosts that draw incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Appended(BubbleId),
    /// Text appended to a streaming bubble
    Delta { id: BubbleId, text: String },
    /// A streaming bubble received its final rendered body
    Finalized(BubbleId),
    Cleared,
}

#[derive(Debug, Default)]
pub struct Transcript {
    bubbles: Vec<Bubble>,
    next_id: u64,
    events: Vec<TranscriptEvent>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, body: BubbleBody) -> BubbleId {
        self.push_bubble(role, body, false)
    }

    /// Append an empty plain-text bubble that deltas will grow.
    pub fn push_streaming(&mut self) -> BubbleId {
        self.push_bubble(Role::Bot, BubbleBody::Text(String::new()), true)
    }

    fn push_bubble(&mut self, role: Role, body: BubbleBody, streaming: bool) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;
        self.bubbles.push(Bubble {
            id,
            role,
            body,
            streaming,
        });
        self.events.push(TranscriptEvent::Appended(id));
        id
    }

    /// Replace the visible text of a streaming bubble with the accumulated
    /// buffer, recording only the newly added part as the delta.
    pub fn update_stream(&mut self, id: BubbleId, accumulated: &str, delta: &str) {
        if let Some(bubble) = self.get_mut(id) {
            bubble.body = BubbleBody::Text(accumulated.to_string());
            self.events.push(TranscriptEvent::Delta {
                id,
                text: delta.to_string(),
            });
        }
    }

    pub fn finalize(&mut self, id: BubbleId, body: BubbleBody) {
        if let Some(bubble) = self.get_mut(id) {
            bubble.body = body;
            bubble.streaming = false;
            self.events.push(TranscriptEvent::Finalized(id));
        }
    }

    /// Stop treating a bubble as streaming, keeping whatever text it has.
    pub fn abandon_stream(&mut self, id: BubbleId) {
        if let Some(bubble) = self.get_mut(id) {
            bubble.streaming = false;
        }
    }

    pub fn clear(&mut self) {
        self.bubbles.clear();
        self.events.push(TranscriptEvent::Cleared);
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.iter().rev().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BubbleId) -> Option<&mut Bubble> {
        self.bubbles.iter_mut().rev().find(|b| b.id == id)
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Take the change notifications recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<TranscriptEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_clears() {
        let mut transcript = Transcript::new();
        let first = transcript.push(Role::User, BubbleBody::Text("a".into()));
        transcript.clear();
        let second = transcript.push(Role::User, BubbleBody::Text("b".into()));
        assert_ne!(first, second);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn stream_lifecycle_records_events() {
        let mut transcript = Transcript::new();
        let id = transcript.push_streaming();
        transcript.update_stream(id, "Hel", "Hel");
        transcript.update_stream(id, "Hello", "lo");
        transcript.finalize(id, BubbleBody::Markup("<p>Hello</p>".into()));

        let bubble = transcript.get(id).unwrap();
        assert!(!bubble.streaming);
        assert!(bubble.body.is_markup());

        assert_eq!(
            transcript.drain_events(),
            vec![
                TranscriptEvent::Appended(id),
                TranscriptEvent::Delta {
                    id,
                    text: "Hel".into()
                },
                TranscriptEvent::Delta {
                    id,
                    text: "lo".into()
                },
                TranscriptEvent::Finalized(id),
            ]
        );
        assert!(transcript.drain_events().is_empty());
    }

    #[test]
    fn updates_to_cleared_bubbles_are_ignored() {
        let mut transcript = Transcript::new();
        let id = transcript.push_streaming();
        transcript.clear();
        transcript.drain_events();

        transcript.update_stream(id, "late", "late");
        transcript.finalize(id, BubbleBody::Text("late".into()));
        assert!(transcript.drain_events().is_empty());
        assert!(transcript.is_empty());
    }
}
