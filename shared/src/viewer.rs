use std::collections::{BTreeMap, HashMap};

use crate::annotations::{Marker, OverlayKind};
use crate::boxzoom::{BoxZoom, BoxZoomOptions, ScreenPoint, ScreenRect};
use crate::coords::{LatLng, LatLngBounds};
use crate::query::QueryParams;
use crate::registry::{SurfaceEntry, SurfaceRegistry, TileLayerDescriptor};
use crate::view_state::{ViewState, encode_camera, encode_overlay, encode_surface};

/// Handle of a layer shown by the map widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// Tiled-image widget the viewer drives.
pub trait MapWidget {
    fn set_view(&mut self, center: LatLng, zoom: f64);
    fn center(&self) -> LatLng;
    fn zoom(&self) -> f64;
    fn fit_bounds(&mut self, bounds: LatLngBounds);
    fn screen_to_projected(&self, point: ScreenPoint) -> LatLng;
    fn show_base_layer(&mut self, layer: LayerId, base: &TileLayerDescriptor);
    /// Replace every marker of an overlay group.
    fn set_overlay_markers(&mut self, layer: LayerId, markers: &[Marker]);
    fn set_overlay_visible(&mut self, layer: LayerId, visible: bool);
}

/// The page URL's query string.
pub trait UrlStore {
    fn search(&self) -> String;
    /// Rewrite the query string without adding a history entry.
    fn replace_search(&mut self, search: &str);
}

/// Marker and label colors, handed to the widget instead of injected as global CSS.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerStyle {
    pub background: String,
    pub marker_fill: String,
    pub marker_stroke: String,
    pub label_font: String,
    pub label_color: String,
    pub label_background: String,
    pub zoom_box_stroke: String,
}

impl Default for ViewerStyle {
    fn default() -> Self {
        Self {
            background: "#1b1b1b".to_string(),
            marker_fill: "#2b82cb".to_string(),
            marker_stroke: "#ffffff".to_string(),
            label_font: "12px sans-serif".to_string(),
            label_color: "#222222".to_string(),
            label_background: "rgba(255, 255, 255, 0.9)".to_string(),
            zoom_box_stroke: "#3388ff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewerConfig {
    /// Load path used when the URL has no `path` parameter.
    pub default_path: String,
    pub style: ViewerStyle,
    /// Named surface listed after all other named surfaces.
    pub pinned_surface: Option<String>,
    /// Fit the new surface's bounds on switch instead of keeping the raw camera numbers.
    pub recenter_on_surface_switch: bool,
    pub box_zoom: BoxZoomOptions,
}

/// Recoverable conditions worth a console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerNotice {
    UnknownLayer(LayerId),
    UnresolvedSurface(String),
}

impl std::fmt::Display for ViewerNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLayer(id) => write!(f, "unknown layer {}", id.0),
            Self::UnresolvedSurface(key) => {
                write!(f, "surface {key:?} not found, using first surface")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerRole {
    Base(usize),
    Overlay(OverlayKind),
}

/// Viewer state for one loaded document.
///
/// All widget and URL events go through here. The current surface is updated before any
/// overlay or camera work that depends on it.
pub struct ViewerContext<W, U> {
    registry: SurfaceRegistry,
    config: ViewerConfig,
    widget: W,
    url: U,
    current: usize,
    layers: HashMap<LayerId, LayerRole>,
    base_layers: Vec<LayerId>,
    overlay_layers: BTreeMap<OverlayKind, LayerId>,
    overlay_visible: BTreeMap<OverlayKind, bool>,
    box_zoom: BoxZoom,
    notices: Vec<ViewerNotice>,
}

impl<W: MapWidget, U: UrlStore> ViewerContext<W, U> {
    /// Apply the URL's view state to a fresh widget.
    pub fn new(registry: SurfaceRegistry, config: ViewerConfig, widget: W, url: U) -> Self {
        let params = QueryParams::parse(&url.search());
        let state = ViewState::decode(&params);

        let mut layers = HashMap::new();
        let mut next_id = 0u32;
        let mut allocate = |role: LayerRole| {
            let id = LayerId(next_id);
            next_id += 1;
            layers.insert(id, role);
            id
        };
        let overlay_layers: BTreeMap<OverlayKind, LayerId> = OverlayKind::ALL
            .into_iter()
            .map(|kind| (kind, allocate(LayerRole::Overlay(kind))))
            .collect();
        let base_layers: Vec<LayerId> = (0..registry.len())
            .map(|pos| allocate(LayerRole::Base(pos)))
            .collect();

        let mut notices = Vec::new();
        let current = registry.resolve_position(state.surface.as_deref());
        if let Some(key) = &state.surface
            && registry.position(key).is_none()
        {
            notices.push(ViewerNotice::UnresolvedSurface(key.clone()));
        }

        let overlay_visible = OverlayKind::ALL
            .into_iter()
            .map(|kind| (kind, state.overlay(kind).unwrap_or(kind.default_visible())))
            .collect();

        let box_zoom = BoxZoom::new(config.box_zoom);
        let mut ctx = Self {
            registry,
            config,
            widget,
            url,
            current,
            layers,
            base_layers,
            overlay_layers,
            overlay_visible,
            box_zoom,
            notices,
        };

        if let Some(entry) = ctx.registry.get(ctx.current) {
            let layer = ctx.base_layers[ctx.current];
            ctx.widget.show_base_layer(layer, &entry.base);
            let center = entry.transform.world_to_projected(state.x, state.y);
            ctx.widget.set_view(center, state.z);
        }
        ctx.populate_overlays();
        for kind in OverlayKind::ALL {
            let visible = ctx.overlay_visible[&kind];
            ctx.widget
                .set_overlay_visible(ctx.overlay_layers[&kind], visible);
            if state.overlay(kind).is_some() {
                ctx.write_url(|params| encode_overlay(params, kind, visible));
            }
        }
        ctx.on_view_change();
        ctx
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn url(&self) -> &U {
        &self.url
    }

    pub fn current_position(&self) -> usize {
        self.current
    }

    pub fn current_surface(&self) -> Option<&SurfaceEntry> {
        self.registry.get(self.current)
    }

    pub fn overlay_layer(&self, kind: OverlayKind) -> LayerId {
        self.overlay_layers[&kind]
    }

    pub fn base_layer(&self, pos: usize) -> Option<LayerId> {
        self.base_layers.get(pos).copied()
    }

    pub fn is_overlay_visible(&self, kind: OverlayKind) -> bool {
        self.overlay_visible[&kind]
    }

    pub fn box_zoom(&self) -> &BoxZoom {
        &self.box_zoom
    }

    pub fn box_zoom_mut(&mut self) -> &mut BoxZoom {
        &mut self.box_zoom
    }

    pub fn drain_notices(&mut self) -> Vec<ViewerNotice> {
        std::mem::take(&mut self.notices)
    }

    /// View state as currently shown.
    pub fn view_state(&self) -> ViewState {
        let world = self
            .current_surface()
            .map(|entry| entry.transform.projected_to_world(self.widget.center()))
            .unwrap_or_default();
        ViewState {
            surface: self.current_surface().map(SurfaceEntry::key),
            x: world.x,
            y: world.y,
            z: self.widget.zoom(),
            overlays: self.overlay_visible.clone(),
        }
    }

    /// Camera moved, zoomed or the widget resized.
    pub fn on_view_change(&mut self) {
        if self.current_surface().is_none() {
            return;
        }
        let state = self.view_state();
        self.write_url(|params| encode_camera(params, state.x, state.y, state.z));
    }

    pub fn on_overlay_add(&mut self, layer: LayerId) {
        self.on_overlay_change(layer, true);
    }

    pub fn on_overlay_remove(&mut self, layer: LayerId) {
        self.on_overlay_change(layer, false);
    }

    fn on_overlay_change(&mut self, layer: LayerId, visible: bool) {
        let Some(LayerRole::Overlay(kind)) = self.layers.get(&layer).copied() else {
            self.notices.push(ViewerNotice::UnknownLayer(layer));
            return;
        };
        self.overlay_visible.insert(kind, visible);
        self.write_url(|params| encode_overlay(params, kind, visible));
    }

    /// Show or hide an overlay from the control panel.
    pub fn set_overlay_visible(&mut self, kind: OverlayKind, visible: bool) {
        let layer = self.overlay_layer(kind);
        self.widget.set_overlay_visible(layer, visible);
        if visible {
            self.on_overlay_add(layer);
        } else {
            self.on_overlay_remove(layer);
        }
    }

    /// The widget now shows another base layer.
    pub fn on_base_layer_change(&mut self, layer: LayerId) {
        let Some(LayerRole::Base(pos)) = self.layers.get(&layer).copied() else {
            self.notices.push(ViewerNotice::UnknownLayer(layer));
            return;
        };
        self.current = pos;
        self.populate_overlays();

        let Some(entry) = self.registry.get(pos) else {
            return;
        };
        let key = entry.key();
        let bounds = entry.base.bounds;
        self.write_url(|params| encode_surface(params, &key));

        if self.config.recenter_on_surface_switch {
            self.widget.fit_bounds(bounds);
            self.on_view_change();
        }
    }

    /// Switch surface from the control panel.
    pub fn select_surface(&mut self, pos: usize) {
        let (Some(layer), Some(entry)) = (self.base_layer(pos), self.registry.get(pos)) else {
            return;
        };
        let shown = (self.widget.center(), self.widget.zoom());
        self.widget.show_base_layer(layer, &entry.base);
        self.on_base_layer_change(layer);
        // The new surface's zoom limits may have moved the camera.
        if !self.config.recenter_on_surface_switch
            && (self.widget.center(), self.widget.zoom()) != shown
        {
            self.on_view_change();
        }
    }

    /// Box-zoom finished on `rect` (widget pixels).
    pub fn on_region_selected(&mut self, rect: ScreenRect) {
        let nw = self.widget.screen_to_projected(rect.origin);
        let se = self.widget.screen_to_projected(rect.far_corner());
        if nw == se {
            return;
        }
        self.widget.fit_bounds(LatLngBounds::from_corners(nw, se));
        self.on_view_change();
    }

    fn populate_overlays(&mut self) {
        let Some(entry) = self.registry.get(self.current) else {
            return;
        };
        for kind in OverlayKind::ALL {
            let layer = self.overlay_layers[&kind];
            self.widget
                .set_overlay_markers(layer, entry.overlays.markers(kind));
        }
    }

    fn write_url(&mut self, edit: impl FnOnce(&mut QueryParams)) {
        let mut params = QueryParams::parse(&self.url.search());
        edit(&mut params);
        self.url.replace_search(&params.to_search());
    }
}
