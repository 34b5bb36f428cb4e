//! ChatWidget component - the embeddable FitBot chat panel

use std::time::Duration;

use chat_session_lib::{
    ChatSession, ConnectOutcome, HtmlRenderer, SendOutcome, SessionConfig, Viewport,
};
use gloo::timers::callback::{Interval, Timeout};
use shared::protocol::{HEALTH_POLL_INTERVAL_SECS, MAX_MESSAGE_CHARS};
use shared::HealthResponse;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlTextAreaElement, KeyboardEvent, ScrollBehavior, ScrollToOptions};
use yew::html::Scope;
use yew::prelude::*;

use super::{MessageBubble, StatusBadge};
use crate::health::fetch_health;
use crate::storage::load_or_create_client_id;
use crate::utils;
use crate::websocket::{ChannelEvent, WsChannel, WsConnector};

/// Input box grows with its content up to this share of the viewport
const INPUT_MAX_VIEWPORT_SHARE: f64 = 0.33;

type Session = ChatSession<WsChannel, HtmlRenderer>;

#[derive(Properties, PartialEq, Default)]
pub struct ChatWidgetProps {
    /// Chat server origin; defaults to the page's own origin
    #[prop_or_default]
    pub origin: Option<AttrValue>,
}

pub enum ChatWidgetMsg {
    Channel(ChannelEvent),
    Connect,
    UpdateInput(String),
    Send,
    Health(HealthResponse),
    Scrolled(Viewport),
    JumpToBottom,
}

pub struct ChatWidget {
    session: Option<Session>,
    connector: WsConnector,
    input_value: String,
    messages_ref: NodeRef,
    input_ref: NodeRef,
    scroll_listener: Option<Closure<dyn Fn()>>,
    reconnect_timer: Option<Timeout>,
    _health_poll: Option<Interval>,
}

impl Component for ChatWidget {
    type Message = ChatWidgetMsg;
    type Properties = ChatWidgetProps;

    fn create(ctx: &Context<Self>) -> Self {
        let link = ctx.link().clone();
        let connector = WsConnector::new(link.callback(ChatWidgetMsg::Channel));

        let origin = ctx
            .props()
            .origin
            .as_ref()
            .map(|o| o.to_string())
            .or_else(utils::page_origin);

        let session = origin.as_deref().and_then(|origin| {
            match SessionConfig::new(origin, load_or_create_client_id()) {
                Ok(config) => Some(ChatSession::new(config, HtmlRenderer::new())),
                Err(e) => {
                    log::error!("Chat unavailable: {}", e);
                    None
                }
            }
        });

        let health_poll = origin
            .as_deref()
            .and_then(|origin| shared::health_url(origin).ok())
            .map(|url| start_health_poll(&link, url.to_string()));

        if session.is_some() {
            link.send_message(ChatWidgetMsg::Connect);
        }

        Self {
            session,
            connector,
            input_value: String::new(),
            messages_ref: NodeRef::default(),
            input_ref: NodeRef::default(),
            scroll_listener: None,
            reconnect_timer: None,
            _health_poll: health_poll,
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        let Some(element) = self.messages_ref.cast::<Element>() else {
            return;
        };

        if first_render {
            let link = ctx.link().clone();
            let element_clone = element.clone();

            let closure = Closure::new(move || {
                link.send_message(ChatWidgetMsg::Scrolled(measure(&element_clone)));
            });

            let _ = element
                .add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref());

            self.scroll_listener = Some(closure);
        }

        let scroll_requested = self
            .session
            .as_mut()
            .is_some_and(|session| session.take_scroll_request());
        if scroll_requested {
            let options = ScrollToOptions::new();
            options.set_top(element.scroll_height() as f64);
            options.set_behavior(ScrollBehavior::Smooth);
            element.scroll_to_with_scroll_to_options(&options);
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        // Measure before new content lands so the append decision sees the
        // position the user was actually at
        let viewport = self.messages_ref.cast::<Element>().map(|el| measure(&el));
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let redraw = match msg {
            ChatWidgetMsg::Connect => {
                self.reconnect_timer = None;
                match session.connect(&mut self.connector) {
                    ConnectOutcome::Connecting => {}
                    ConnectOutcome::RetryAfter(delay) => {
                        self.reconnect_timer = Some(schedule_reconnect(ctx.link(), delay));
                    }
                }
                true
            }
            ChatWidgetMsg::Channel(ChannelEvent::Opened) => {
                session.on_open();
                true
            }
            ChatWidgetMsg::Channel(ChannelEvent::Frame(frame)) => {
                if let Some(viewport) = viewport {
                    session.observe_viewport(viewport);
                }
                session.on_frame(frame);
                true
            }
            ChatWidgetMsg::Channel(ChannelEvent::Closed) => {
                if let Some(delay) = session.on_close() {
                    self.reconnect_timer = Some(schedule_reconnect(ctx.link(), delay));
                }
                true
            }
            ChatWidgetMsg::UpdateInput(value) => {
                self.input_value = value;
                self.fit_input_height();
                false
            }
            ChatWidgetMsg::Send => {
                if let Some(viewport) = viewport {
                    session.observe_viewport(viewport);
                }
                let outcome = match session.send_input(&self.input_value) {
                    SendOutcome::NeedsConfirmation => {
                        if utils::confirm("Clear the whole conversation?") {
                            session.confirm_reset()
                        } else {
                            SendOutcome::NeedsConfirmation
                        }
                    }
                    outcome => outcome,
                };
                if outcome == SendOutcome::Sent {
                    self.input_value.clear();
                    self.reset_input_height();
                }
                true
            }
            ChatWidgetMsg::Health(health) => {
                session.apply_health(&health);
                true
            }
            ChatWidgetMsg::Scrolled(viewport) => {
                let was_visible = session.jump_visible();
                session.observe_viewport(viewport);
                was_visible != session.jump_visible()
            }
            ChatWidgetMsg::JumpToBottom => {
                session.jump_to_bottom();
                true
            }
        };

        // This host redraws from the transcript itself
        if let Some(session) = self.session.as_mut() {
            session.drain_transcript_events();
        }
        redraw
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let Some(session) = self.session.as_ref() else {
            return html! {
                <div class="chat-widget unavailable">
                    <p>{ "Chat is unavailable on this page." }</p>
                </div>
            };
        };
        let link = ctx.link();

        let handle_submit = link.callback(|e: SubmitEvent| {
            e.prevent_default();
            ChatWidgetMsg::Send
        });

        let handle_input = link.callback(|e: InputEvent| {
            let input: HtmlTextAreaElement = e.target_unchecked_into();
            ChatWidgetMsg::UpdateInput(input.value())
        });

        // Enter sends, Shift+Enter falls through to the default newline
        let handle_keydown = link.batch_callback(|e: KeyboardEvent| {
            if e.key() == "Enter" && !e.shift_key() && !e.is_composing() {
                e.prevent_default();
                Some(ChatWidgetMsg::Send)
            } else {
                None
            }
        });

        let jump = link.callback(|_: MouseEvent| ChatWidgetMsg::JumpToBottom);
        let enabled = session.input_enabled();

        html! {
            <div class="chat-widget">
                <header class="chat-header">
                    <span class="chat-title">{ session.config().bot_name.clone() }</span>
                    <StatusBadge status={session.status()} />
                </header>

                <div class="chat-messages" ref={self.messages_ref.clone()}>
                    {
                        session.transcript().bubbles().iter().map(|bubble| {
                            html! { <MessageBubble key={bubble.id.get()} bubble={bubble.clone()} /> }
                        }).collect::<Html>()
                    }
                    if session.is_typing() {
                        <div class="chat-message bot typing-indicator" aria-label="typing">
                            <span></span><span></span><span></span>
                        </div>
                    }
                </div>

                if session.jump_visible() {
                    <button class="chat-jump-bottom" type="button" onclick={jump}>
                        { "↓ New messages" }
                    </button>
                }

                <form class="chat-input" onsubmit={handle_submit}>
                    <textarea
                        ref={self.input_ref.clone()}
                        class="chat-input-box"
                        placeholder="Write a message... (Shift+Enter for new line)"
                        value={self.input_value.clone()}
                        oninput={handle_input}
                        onkeydown={handle_keydown}
                        disabled={!enabled}
                        maxlength={MAX_MESSAGE_CHARS.to_string()}
                        rows="1"
                    />
                    <button type="submit" class="chat-send" disabled={!enabled}>
                        { "Send" }
                    </button>
                </form>
            </div>
        }
    }
}

impl ChatWidget {
    fn fit_input_height(&self) {
        let Some(input) = self.input_ref.cast::<HtmlTextAreaElement>() else {
            return;
        };
        let style = input.style();
        let _ = style.set_property("height", "auto");

        let content = input.scroll_height() as f64;
        let height = match utils::inner_height() {
            Some(viewport) => content.min(viewport * INPUT_MAX_VIEWPORT_SHARE),
            None => content,
        };
        let _ = style.set_property("height", &format!("{}px", height));
    }

    fn reset_input_height(&self) {
        if let Some(input) = self.input_ref.cast::<HtmlTextAreaElement>() {
            let _ = input.style().remove_property("height");
        }
    }
}

fn measure(element: &Element) -> Viewport {
    Viewport {
        scroll_top: element.scroll_top(),
        scroll_height: element.scroll_height(),
        client_height: element.client_height(),
    }
}

fn schedule_reconnect(link: &Scope<ChatWidget>, delay: Duration) -> Timeout {
    let link = link.clone();
    let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
    log::info!("Reconnecting in {}ms", delay_ms);
    Timeout::new(delay_ms, move || {
        link.send_message(ChatWidgetMsg::Connect);
    })
}

/// Poll right away, then every `HEALTH_POLL_INTERVAL_SECS`. Failures keep
/// the last known status.
fn start_health_poll(link: &Scope<ChatWidget>, url: String) -> Interval {
    let poll = {
        let link = link.clone();
        move || {
            let link = link.clone();
            let url = url.clone();
            spawn_local(async move {
                match fetch_health(&url).await {
                    Ok(health) => link.send_message(ChatWidgetMsg::Health(health)),
                    Err(e) => log::debug!("Health check failed: {}", e),
                }
            });
        }
    };

    poll();
    let period_ms = Duration::from_secs(HEALTH_POLL_INTERVAL_SECS).as_millis() as u32;
    Interval::new(period_ms, poll)
}
