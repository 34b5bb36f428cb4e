mod chat_widget;
mod message_bubble;
mod status_indicator;

pub use chat_widget::{ChatWidget, ChatWidgetProps};
pub use message_bubble::MessageBubble;
pub use status_indicator::StatusBadge;
