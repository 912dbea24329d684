use mapshot_shared::UrlStore;
use wasm_bindgen::JsValue;

/// The page's own URL; rewrites go through `history.replaceState`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserUrl;

impl UrlStore for BrowserUrl {
    fn search(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    fn replace_search(&mut self, search: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            return;
        };
        let pathname = window.location().pathname().unwrap_or_default();
        let hash = window.location().hash().unwrap_or_default();
        let url = format!("{pathname}{search}{hash}");
        if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(&url)) {
            crate::log::warn(&format!("replaceState failed: {e:?}"));
        }
    }
}

/// `location.pathname` of the page.
pub fn current_pathname() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_default()
}

/// Pages under `/map` show the viewer; everything else is the listing.
pub fn is_viewer_path(pathname: &str) -> bool {
    pathname == "/map" || pathname.starts_with("/map/")
}
