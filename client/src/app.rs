use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use leptos::prelude::*;
use mapshot_shared::query::QueryParams;
use mapshot_shared::registry::SurfaceCategory;
use mapshot_shared::{
    MapshotDocument, OverlayKind, SurfaceRegistry, UrlStore, ViewerConfig, ViewerContext,
    view_state,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::canvas::{
    CanvasMapWidget, MapCanvas, SharedViewer, ViewerHandle, render_frame, zoom_by_step,
};
use crate::fetch::{fetch_document, fetch_link_target};
use crate::listing::Listing;
use crate::log;
use crate::render_loop::RedrawScheduler;
use crate::url::{BrowserUrl, current_pathname, is_viewer_path};

/// Global the hosting page may set to pick the document shown without a `path` parameter.
const DEFAULT_PATH_GLOBAL: &str = "MAPSHOT_DEFAULT_PATH";

fn host_default_path() -> String {
    web_sys::window()
        .and_then(|w| Reflect::get(&w, &JsValue::from_str(DEFAULT_PATH_GLOBAL)).ok())
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

fn viewport_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// Follow a share link if the URL has one, else use `path` or the host default.
async fn resolve_load_path(default_path: &str) -> Result<String, String> {
    let params = QueryParams::parse(&BrowserUrl.search());
    let Some(link) = view_state::link_id(&params) else {
        return Ok(view_state::load_path(&params, default_path));
    };
    let target = fetch_link_target(link).await?;
    let path = target
        .load_path()
        .ok_or_else(|| format!("link {link:?} has no path"))?;
    Ok(if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    })
}

async fn load_document(default_path: &str) -> Result<(String, MapshotDocument), String> {
    let load_path = resolve_load_path(default_path).await?;
    let doc = fetch_document(&load_path).await?;
    Ok((load_path, doc))
}

/// Control-panel model derived from the registry once per document.
#[derive(Debug, Clone, PartialEq)]
struct SurfaceChoice {
    pos: usize,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct SurfaceGroup {
    label: &'static str,
    choices: Vec<SurfaceChoice>,
}

fn surface_groups(registry: &SurfaceRegistry, pinned: Option<&str>) -> Vec<SurfaceGroup> {
    registry
        .categories(pinned)
        .into_iter()
        .map(|(category, positions): (SurfaceCategory, Vec<usize>)| SurfaceGroup {
            label: category.label(),
            choices: positions
                .into_iter()
                .filter_map(|pos| {
                    registry.get(pos).map(|entry| SurfaceChoice {
                        pos,
                        name: entry.name().to_string(),
                    })
                })
                .collect(),
        })
        .collect()
}

fn forward_notices(viewer: &SharedViewer) {
    for notice in viewer.borrow_mut().drain_notices() {
        log::warn(&format!("viewer: {notice}"));
    }
}

#[component]
pub fn App() -> impl IntoView {
    if is_viewer_path(&current_pathname()) {
        view! { <Viewer /> }.into_any()
    } else {
        view! { <Listing /> }.into_any()
    }
}

#[component]
fn Viewer() -> impl IntoView {
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let viewer: ViewerHandle = StoredValue::new_local(None);
    let groups: RwSignal<Vec<SurfaceGroup>> = RwSignal::new(Vec::new());
    let current: RwSignal<usize> = RwSignal::new(0);
    let overlays: RwSignal<Vec<(OverlayKind, bool)>> = RwSignal::new(Vec::new());
    let box_zoom_on: RwSignal<bool> = RwSignal::new(false);
    let load_error: RwSignal<Option<String>> = RwSignal::new(None);

    let scheduler = RedrawScheduler::new(move || render_frame(canvas_ref, viewer));
    let redraw = scheduler.as_redraw();

    let config = ViewerConfig {
        default_path: host_default_path(),
        ..ViewerConfig::default()
    };

    {
        let redraw = redraw.clone();
        spawn_local(async move {
            let (load_path, doc) = match load_document(&config.default_path).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    log::warn(&format!("mapshot load failed: {e}"));
                    load_error.set(Some(e));
                    return;
                }
            };
            log::info(&format!(
                "loaded {load_path}mapshot.json: {} surfaces",
                doc.surfaces.len()
            ));

            let registry = SurfaceRegistry::build(&doc, &load_path);
            let (w, h) = viewport_dimensions();
            let widget = CanvasMapWidget::new(config.style.clone(), w, h, redraw.clone());
            let ctx = ViewerContext::new(registry, config, widget, BrowserUrl);

            groups.set(surface_groups(
                ctx.registry(),
                ctx.config().pinned_surface.as_deref(),
            ));
            current.set(ctx.current_position());
            overlays.set(
                OverlayKind::ALL
                    .into_iter()
                    .map(|kind| (kind, ctx.is_overlay_visible(kind)))
                    .collect(),
            );
            box_zoom_on.set(ctx.box_zoom().is_active());

            let shared: SharedViewer = Rc::new(RefCell::new(ctx));
            forward_notices(&shared);
            viewer.set_value(Some(shared));
            redraw();
        });
    }

    let select_surface = move |pos: usize| {
        if let Some(shared) = viewer.get_value() {
            shared.borrow_mut().select_surface(pos);
            current.set(shared.borrow().current_position());
            forward_notices(&shared);
        }
    };

    let toggle_overlay = move |kind: OverlayKind, visible: bool| {
        if let Some(shared) = viewer.get_value() {
            shared.borrow_mut().set_overlay_visible(kind, visible);
            let shown = shared.borrow().is_overlay_visible(kind);
            overlays.update(|items| {
                for (k, v) in items.iter_mut() {
                    if *k == kind {
                        *v = shown;
                    }
                }
            });
            forward_notices(&shared);
        }
    };

    let toggle_box_zoom = move |_| {
        if let Some(shared) = viewer.get_value() {
            let mut ctx = shared.borrow_mut();
            ctx.box_zoom_mut().toggle();
            box_zoom_on.set(ctx.box_zoom().is_active());
        }
    };

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden;">
            <MapCanvas viewer=viewer canvas_ref=canvas_ref redraw=redraw box_zoom_on=box_zoom_on />
            {move || load_error.get().map(|e| view! {
                <div class="viewer-error" style="position: absolute; top: 12px; left: 12px; padding: 8px 12px; background: rgba(0,0,0,0.75); color: #f0f0f0; font: 13px sans-serif; border-radius: 4px;">
                    {format!("Could not load mapshot: {e}")}
                </div>
            })}
            <div
                class="control-panel"
                style="position: absolute; top: 10px; right: 10px; z-index: 10; padding: 8px 10px; background: rgba(255,255,255,0.92); color: #222; font: 13px sans-serif; border-radius: 4px; box-shadow: 0 1px 5px rgba(0,0,0,0.4);"
            >
                {move || {
                    groups
                        .get()
                        .into_iter()
                        .map(|group| view! {
                            <div class="surface-group">
                                <div style="font-weight: bold; margin: 4px 0 2px;">{group.label}</div>
                                {group
                                    .choices
                                    .into_iter()
                                    .map(|choice| {
                                        let pos = choice.pos;
                                        view! {
                                            <label style="display: block; cursor: pointer;">
                                                <input
                                                    type="radio"
                                                    name="surface"
                                                    prop:checked=move || current.get() == pos
                                                    on:change=move |_| select_surface(pos)
                                                />
                                                " "
                                                {choice.name}
                                            </label>
                                        }
                                    })
                                    .collect_view()}
                            </div>
                        })
                        .collect_view()
                }}
                {move || {
                    let items = overlays.get();
                    (!items.is_empty()).then(|| view! {
                        <div class="overlay-group" style="border-top: 1px solid #ccc; margin-top: 6px; padding-top: 4px;">
                            {items
                                .into_iter()
                                .map(|(kind, visible)| view! {
                                    <label style="display: block; cursor: pointer;">
                                        <input
                                            type="checkbox"
                                            prop:checked=visible
                                            on:change=move |e| toggle_overlay(kind, event_target_checked(&e))
                                        />
                                        " "
                                        {kind.display_name()}
                                    </label>
                                })
                                .collect_view()}
                        </div>
                    })
                }}
                <div class="zoom-control" style="display: flex; gap: 4px; margin-top: 6px;">
                    <button
                        style="flex: 1; cursor: pointer;"
                        title="Zoom in"
                        on:click=move |_| zoom_by_step(viewer, 1.0)
                    >
                        "+"
                    </button>
                    <button
                        style="flex: 1; cursor: pointer;"
                        title="Zoom out"
                        on:click=move |_| zoom_by_step(viewer, -1.0)
                    >
                        "-"
                    </button>
                </div>
                <button
                    style="margin-top: 6px; width: 100%; cursor: pointer;"
                    title="Drag a rectangle on the map to zoom to it"
                    on:click=toggle_box_zoom
                >
                    {move || if box_zoom_on.get() { "Box zoom: on" } else { "Box zoom: off" }}
                </button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapshot_shared::parse_document;

    #[test]
    fn groups_follow_display_order() {
        let doc = parse_document(
            r#"{"surfaces":[
                {"surface_name":"platform-10","surface_idx":7,"file_prefix":"d-p10-"},
                {"surface_name":"nauvis","surface_idx":1,"file_prefix":"d-nauvis-"},
                {"surface_name":"platform-2","surface_idx":5,"file_prefix":"d-p2-"},
                {"surface_name":"gleba","surface_idx":3,"file_prefix":"d-gleba-"}
            ]}"#,
        )
        .expect("document");
        let registry = SurfaceRegistry::build(&doc, "data/x/");
        let groups = surface_groups(&registry, None);
        let names: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| (g.label, g.choices.iter().map(|c| c.name.as_str()).collect()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Surfaces", vec!["gleba", "nauvis"]),
                ("Platforms", vec!["platform-2", "platform-10"]),
            ]
        );
        assert_eq!(groups[0].choices[1].pos, 1);
    }
}
