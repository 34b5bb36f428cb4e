//! Persistent client id in localStorage.

use shared::protocol::CLIENT_ID_STORAGE_KEY;
use shared::ClientId;

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// Load the stored client id, creating and saving one on first visit.
///
/// Stored values are used as-is. When storage is unavailable (private mode,
/// blocked cookies) the id only lives for this page load.
pub fn load_or_create_client_id() -> ClientId {
    let storage = local_storage();

    let stored = storage
        .as_ref()
        .and_then(|s| s.get_item(CLIENT_ID_STORAGE_KEY).ok().flatten())
        .filter(|id| !id.is_empty());

    if let Some(id) = stored {
        let id = ClientId::from_stored(id);
        if !id.is_accepted_by_server() {
            log::warn!("Stored client id {:?} will be rejected by the server", id.as_str());
        }
        return id;
    }

    let id = ClientId::generate(
        js_sys::Date::now() as u64,
        (js_sys::Math::random() * 1e16) as u64,
    );

    match storage {
        Some(storage) => {
            if storage.set_item(CLIENT_ID_STORAGE_KEY, id.as_str()).is_err() {
                log::warn!("Could not persist client id");
            }
        }
        None => log::warn!("localStorage unavailable, client id is not persisted"),
    }
    id
}
