//! One transcript bubble

use chat_session_lib::{Bubble, BubbleBody};
use shared::Role;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct MessageBubbleProps {
    pub bubble: Bubble,
}

#[function_component(MessageBubble)]
pub fn message_bubble(props: &MessageBubbleProps) -> Html {
    let bubble = &props.bubble;
    let role_class = match bubble.role {
        Role::User => "user",
        Role::Bot => "bot",
    };

    // Markup bodies were sanitized when the reply resolved; text bodies are
    // rendered as plain text nodes with `white-space: pre-wrap`
    let body = match &bubble.body {
        BubbleBody::Markup(markup) => Html::from_html_unchecked(AttrValue::from(markup.clone())),
        BubbleBody::Text(text) => html! { <>{ text.clone() }</> },
    };

    html! {
        <div class={classes!(
            "chat-message",
            role_class,
            bubble.streaming.then_some("streaming"),
            bubble.body.is_markup().then_some("markdown-body"),
        )}>
            { body }
        </div>
    }
}
