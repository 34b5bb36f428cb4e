mod components;
mod health;
mod storage;
pub mod utils;
mod websocket;

pub use components::{ChatWidget, ChatWidgetProps};

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn run_app() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<ChatWidget>::new().render();
}
