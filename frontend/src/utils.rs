use web_sys::window;

/// Get the page origin (e.g., "http://localhost:8000" or "https://fitbot.example")
pub fn page_origin() -> Option<String> {
    let location = window()?.location();

    let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let host = location.host().ok()?;

    Some(format!("{}//{}", protocol, host))
}

/// Viewport height in CSS pixels, used to cap the input box.
pub fn inner_height() -> Option<f64> {
    window()?.inner_height().ok()?.as_f64()
}

/// Ask the user to confirm a destructive action. Blocked dialogs count as no.
pub fn confirm(message: &str) -> bool {
    window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}
