use chat_session_lib::{ConnectionStatus, StatusIndicator};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct StatusIndicatorProps {
    pub status: StatusIndicator,
}

#[function_component(StatusBadge)]
pub fn status_badge(props: &StatusIndicatorProps) -> Html {
    let status = props.status;
    let dot_class = match (status.connection, status.ai_available) {
        (ConnectionStatus::Online, Some(false)) => "degraded",
        (ConnectionStatus::Online, _) => "online",
        (ConnectionStatus::Connecting, _) => "connecting",
        (ConnectionStatus::Reconnecting, _) => "offline",
    };

    html! {
        <div class="chat-status" role="status" aria-live="polite">
            <span class={classes!("chat-status-dot", dot_class)}></span>
            <span class="chat-status-label">{ status.label() }</span>
        </div>
    }
}
