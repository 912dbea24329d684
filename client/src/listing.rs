use leptos::prelude::*;
use mapshot_shared::query::QueryParams;
use mapshot_shared::{ShotsJson, ShotsJsonInfo, view_state};
use wasm_bindgen_futures::spawn_local;

use crate::fetch::fetch_listing;
use crate::log;
use crate::time_format::format_play_time;

/// Viewer link for one rendered version.
fn viewer_href(info: &ShotsJsonInfo) -> String {
    let mut params = QueryParams::default();
    params.set(view_state::KEY_PATH, info.path.as_str());
    format!("map/{}", params.to_search())
}

fn version_label(info: &ShotsJsonInfo) -> String {
    let mut label = info.name.clone();
    if !info.surface.is_empty() {
        label.push_str(" [");
        label.push_str(&info.surface);
        label.push(']');
    }
    label.push_str(" (play time ");
    label.push_str(&format_play_time(info.ticks_played));
    label.push(')');
    label
}

#[derive(Debug, Clone, PartialEq)]
enum ListingState {
    Loading,
    Loaded(ShotsJson),
    Failed(String),
}

/// Index page: every discovered mapshot grouped by save.
#[component]
pub fn Listing() -> impl IntoView {
    let state: RwSignal<ListingState> = RwSignal::new(ListingState::Loading);

    spawn_local(async move {
        match fetch_listing().await {
            Ok(shots) => state.set(ListingState::Loaded(shots)),
            Err(e) => {
                log::warn(&format!("listing fetch failed: {e}"));
                state.set(ListingState::Failed(e));
            }
        }
    });

    view! {
        <div class="listing" style="max-width: 960px; margin: 0 auto; padding: 16px; font: 14px sans-serif;">
            <h1>"Mapshots"</h1>
            {move || match state.get() {
                ListingState::Loading => view! { <p>"Loading..."</p> }.into_any(),
                ListingState::Failed(e) => {
                    view! { <p class="listing-error">{format!("Could not load the list of mapshots: {e}")}</p> }
                        .into_any()
                }
                ListingState::Loaded(shots) if shots.all.is_empty() => view! {
                    <p>
                        "No mapshot found yet. Run the mapshot command in game, then reload this page."
                    </p>
                }
                .into_any(),
                ListingState::Loaded(shots) => shots
                    .all
                    .into_iter()
                    .map(|save| view! {
                        <section class="save">
                            <h2>{save.savename}</h2>
                            <ul>
                                {save
                                    .versions
                                    .into_iter()
                                    .map(|info| view! {
                                        <li>
                                            <a href=viewer_href(&info)>{version_label(&info)}</a>
                                        </li>
                                    })
                                    .collect_view()}
                            </ul>
                        </section>
                    })
                    .collect_view()
                    .into_any(),
            }}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(surface: &str) -> ShotsJsonInfo {
        ShotsJsonInfo {
            name: "mapshot/factory/d-100".to_string(),
            path: "/data/mapshot/factory/d-100/".to_string(),
            ticks_played: 216_000 + 61 * 60,
            surface: surface.to_string(),
        }
    }

    #[test]
    fn links_point_at_the_viewer() {
        assert_eq!(
            viewer_href(&info("nauvis")),
            "map/?path=%2Fdata%2Fmapshot%2Ffactory%2Fd-100%2F"
        );
    }

    #[test]
    fn link_path_survives_query_parsing() {
        let mut odd = info("nauvis");
        odd.path = "/data/mapshot/a+b&c#d/v%201/".to_string();
        let href = viewer_href(&odd);
        let search = href.strip_prefix("map/").expect("viewer prefix");
        assert!(!search.contains('#'));
        let params = QueryParams::parse(search);
        assert_eq!(params.get(view_state::KEY_PATH), Some(odd.path.as_str()));
    }

    #[test]
    fn labels_carry_surfaces_and_play_time() {
        assert_eq!(
            version_label(&info("nauvis, platform-1")),
            "mapshot/factory/d-100 [nauvis, platform-1] (play time 01:01:01)"
        );
        assert_eq!(
            version_label(&info("")),
            "mapshot/factory/d-100 (play time 01:01:01)"
        );
    }
}
