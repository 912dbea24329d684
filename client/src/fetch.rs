use mapshot_shared::{LinkTarget, MapshotDocument, ShotsJson, parse_document};
use serde::de::DeserializeOwned;

async fn get(url: &str) -> Result<gloo_net::http::Response, String> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }
    Ok(response)
}

async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, String> {
    get(url)
        .await?
        .json::<T>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

pub async fn fetch_listing() -> Result<ShotsJson, String> {
    get_json("/shots.json").await
}

/// Resolve a share-link id to the newest render of that save.
pub async fn fetch_link_target(link_id: &str) -> Result<LinkTarget, String> {
    get_json(&format!("/latest/{link_id}")).await
}

/// Fetch and normalize `mapshot.json` under `load_path`.
pub async fn fetch_document(load_path: &str) -> Result<MapshotDocument, String> {
    let raw = get(&format!("{load_path}mapshot.json"))
        .await?
        .text()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    parse_document(&raw).map_err(|e| format!("parse error: {e}"))
}
