use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::rc::Rc;

use leptos::prelude::*;
use mapshot_shared::boxzoom::{ScreenPoint, ScreenRect};
use mapshot_shared::rich_text::plain_text;
use mapshot_shared::viewer::LayerId;
use mapshot_shared::{
    LabelMode, LatLng, LatLngBounds, MapWidget, Marker, TileLayerDescriptor, ViewerContext,
    ViewerStyle,
};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, MouseEvent, PointerEvent, WheelEvent};

use crate::tiles::{TileCache, visible_tiles};
use crate::url::BrowserUrl;
use crate::viewport::Viewport;

const MARKER_RADIUS: f64 = 6.0;
const HIT_RADIUS: f64 = 10.0;
const LABEL_PADDING: f64 = 3.0;
const LABEL_OFFSET: f64 = 10.0;
const LABEL_HEIGHT: f64 = 18.0;
/// Pointer travel below which a press counts as a click.
const CLICK_SLOP_PX: f64 = 5.0;
const KEY_PAN_PX: f64 = 80.0;
/// Wheel travel equivalent of one zoom step from the keyboard or the zoom buttons.
const ZOOM_STEP_PX: f64 = 60.0;

pub type SharedViewer = Rc<RefCell<ViewerContext<CanvasMapWidget, BrowserUrl>>>;
pub type ViewerHandle = StoredValue<Option<SharedViewer>, LocalStorage>;

/// Marker `index` of overlay `layer`.
type MarkerRef = (LayerId, usize);

#[derive(Default)]
struct OverlayLayer {
    markers: Vec<Marker>,
    visible: bool,
}

/// Canvas 2D map widget over the CRS-simple plane.
pub struct CanvasMapWidget {
    viewport: Viewport,
    base: Option<(LayerId, TileLayerDescriptor)>,
    overlays: BTreeMap<LayerId, OverlayLayer>,
    style: ViewerStyle,
    tiles: TileCache,
    zoom_box: Option<ScreenRect>,
    hovered: Option<MarkerRef>,
    popup: Option<MarkerRef>,
    redraw: Rc<dyn Fn()>,
}

impl CanvasMapWidget {
    pub fn new(style: ViewerStyle, width: f64, height: f64, redraw: Rc<dyn Fn()>) -> Self {
        let mut viewport = Viewport::default();
        viewport.resize(width, height);
        Self {
            viewport,
            base: None,
            overlays: BTreeMap::new(),
            style,
            tiles: TileCache::new(redraw.clone()),
            zoom_box: None,
            hovered: None,
            popup: None,
            redraw,
        }
    }

    fn request_redraw(&self) {
        (self.redraw)();
    }

    /// Returns whether the size changed.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        if self.viewport.width == width && self.viewport.height == height {
            return false;
        }
        self.viewport.resize(width, height);
        true
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
        self.request_redraw();
    }

    pub fn zoom_at(&mut self, wheel_delta_px: f64, at: ScreenPoint) {
        self.viewport.zoom_at(wheel_delta_px, at);
        self.request_redraw();
    }

    /// Zoom `steps` levels in (positive) or out (negative) around the canvas center.
    pub fn zoom_step(&mut self, steps: f64) {
        let middle = ScreenPoint::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        self.zoom_at(-steps * ZOOM_STEP_PX, middle);
    }

    pub fn set_zoom_box(&mut self, rect: Option<ScreenRect>) {
        if self.zoom_box != rect {
            self.zoom_box = rect;
            self.request_redraw();
        }
    }

    pub fn set_hovered_at(&mut self, at: ScreenPoint) {
        let hit = hit_test(&self.viewport, &self.overlays, at);
        if hit != self.hovered {
            self.hovered = hit;
            self.request_redraw();
        }
    }

    /// Open the popup of the marker under `at`, or close the open one.
    pub fn click_at(&mut self, at: ScreenPoint) {
        let hit = hit_test(&self.viewport, &self.overlays, at).filter(|&(layer, index)| {
            self.marker(layer, index)
                .is_some_and(|m| m.label_mode == LabelMode::Popup)
        });
        self.popup = if hit == self.popup { None } else { hit };
        self.request_redraw();
    }

    fn marker(&self, layer: LayerId, index: usize) -> Option<&Marker> {
        self.overlays
            .get(&layer)
            .filter(|o| o.visible)
            .and_then(|o| o.markers.get(index))
    }

    pub fn draw(&mut self, ctx: &CanvasRenderingContext2d) {
        let vp = &self.viewport;
        ctx.set_fill_style_str(&self.style.background);
        ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

        if let Some((_, base)) = &self.base {
            ctx.set_image_smoothing_enabled(false);
            for tile in visible_tiles(vp, base) {
                let url = base.tile_url(tile.z, tile.x, tile.y);
                if let Some(image) = self.tiles.get_or_load(&url) {
                    let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        &image,
                        tile.screen.origin.x,
                        tile.screen.origin.y,
                        tile.screen.width,
                        tile.screen.height,
                    );
                }
            }
        }

        for (&layer, overlay) in &self.overlays {
            if !overlay.visible {
                continue;
            }
            for (index, marker) in overlay.markers.iter().enumerate() {
                let at = vp.projected_to_screen(marker.position);
                if !on_screen(vp, at) {
                    continue;
                }
                draw_marker(ctx, &self.style, at);
                let picked = Some((layer, index));
                let text = match marker.label_mode {
                    LabelMode::Permanent => Some(plain_text(&marker.label)),
                    LabelMode::Popup if self.popup == picked => Some(plain_text(&marker.label)),
                    _ if self.hovered == picked => Some(marker.title.clone()),
                    _ => None,
                };
                if let Some(text) = text.filter(|t| !t.is_empty()) {
                    draw_label(ctx, &self.style, at, &text);
                }
            }
        }

        if let Some(rect) = self.zoom_box {
            ctx.set_stroke_style_str(&self.style.zoom_box_stroke);
            ctx.set_line_width(2.0);
            ctx.stroke_rect(rect.origin.x, rect.origin.y, rect.width, rect.height);
        }
    }
}

impl MapWidget for CanvasMapWidget {
    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.viewport.set_view(center, zoom);
        self.request_redraw();
    }

    fn center(&self) -> LatLng {
        self.viewport.center
    }

    fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.viewport.fit_bounds(bounds);
        self.request_redraw();
    }

    fn screen_to_projected(&self, point: ScreenPoint) -> LatLng {
        self.viewport.screen_to_projected(point)
    }

    fn show_base_layer(&mut self, layer: LayerId, base: &TileLayerDescriptor) {
        let changed = self
            .base
            .as_ref()
            .is_none_or(|(_, current)| current.url_template != base.url_template);
        if changed {
            self.tiles.clear();
        }
        self.viewport
            .set_zoom_limits(f64::from(base.min_zoom), f64::from(base.max_zoom));
        self.base = Some((layer, base.clone()));
        self.request_redraw();
    }

    fn set_overlay_markers(&mut self, layer: LayerId, markers: &[Marker]) {
        self.overlays.entry(layer).or_default().markers = markers.to_vec();
        if self.popup.is_some_and(|(l, _)| l == layer) {
            self.popup = None;
        }
        if self.hovered.is_some_and(|(l, _)| l == layer) {
            self.hovered = None;
        }
        self.request_redraw();
    }

    fn set_overlay_visible(&mut self, layer: LayerId, visible: bool) {
        self.overlays.entry(layer).or_default().visible = visible;
        self.request_redraw();
    }
}

fn on_screen(vp: &Viewport, p: ScreenPoint) -> bool {
    let margin = HIT_RADIUS;
    p.x >= -margin && p.y >= -margin && p.x <= vp.width + margin && p.y <= vp.height + margin
}

/// Nearest visible marker within reach of `at`.
fn hit_test(
    vp: &Viewport,
    overlays: &BTreeMap<LayerId, OverlayLayer>,
    at: ScreenPoint,
) -> Option<MarkerRef> {
    let mut best: Option<(f64, MarkerRef)> = None;
    for (&layer, overlay) in overlays {
        if !overlay.visible {
            continue;
        }
        for (index, marker) in overlay.markers.iter().enumerate() {
            let p = vp.projected_to_screen(marker.position);
            let dist = (p.x - at.x).hypot(p.y - at.y);
            if dist <= HIT_RADIUS && best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, (layer, index)));
            }
        }
    }
    best.map(|(_, hit)| hit)
}

fn draw_marker(ctx: &CanvasRenderingContext2d, style: &ViewerStyle, at: ScreenPoint) {
    ctx.begin_path();
    if ctx.arc(at.x, at.y, MARKER_RADIUS, 0.0, TAU).is_err() {
        return;
    }
    ctx.set_fill_style_str(&style.marker_fill);
    ctx.fill();
    ctx.set_stroke_style_str(&style.marker_stroke);
    ctx.set_line_width(2.0);
    ctx.stroke();
}

fn draw_label(ctx: &CanvasRenderingContext2d, style: &ViewerStyle, at: ScreenPoint, text: &str) {
    ctx.set_font(&style.label_font);
    ctx.set_text_baseline("middle");
    let width = ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0);
    let x = at.x + LABEL_OFFSET;
    let y = at.y - LABEL_HEIGHT / 2.0;
    ctx.set_fill_style_str(&style.label_background);
    ctx.fill_rect(x, y, width + LABEL_PADDING * 2.0, LABEL_HEIGHT);
    ctx.set_fill_style_str(&style.label_color);
    let _ = ctx.fill_text(text, x + LABEL_PADDING, at.y);
}

/// Size the canvas to its container and repaint.
pub fn render_frame(canvas_ref: NodeRef<leptos::html::Canvas>, viewer: ViewerHandle) {
    let Some(canvas) = canvas_ref.get_untracked() else {
        return;
    };
    let Some(shared) = viewer.get_value() else {
        return;
    };
    let Some(parent) = canvas.parent_element() else {
        return;
    };
    let w = f64::from(parent.client_width());
    let h = f64::from(parent.client_height());
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0)
        .max(1.0);
    let backing_w = (w * dpr).round() as u32;
    let backing_h = (h * dpr).round() as u32;
    if canvas.width() != backing_w || canvas.height() != backing_h {
        canvas.set_width(backing_w);
        canvas.set_height(backing_h);
    }

    let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
    else {
        return;
    };
    let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);

    let mut state = shared.borrow_mut();
    if state.widget_mut().resize(w, h) {
        state.on_view_change();
    }
    state.widget_mut().draw(&ctx);
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, e: &MouseEvent) -> ScreenPoint {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            ScreenPoint::new(
                f64::from(e.client_x()) - rect.left(),
                f64::from(e.client_y()) - rect.top(),
            )
        })
        .unwrap_or_else(|| ScreenPoint::new(f64::from(e.offset_x()), f64::from(e.offset_y())))
}

fn with_viewer(viewer: ViewerHandle, f: impl FnOnce(&mut ViewerContext<CanvasMapWidget, BrowserUrl>)) {
    if let Some(shared) = viewer.get_value() {
        f(&mut shared.borrow_mut());
    }
}

/// Zoom button handler: one step around the center, then sync the URL.
pub fn zoom_by_step(viewer: ViewerHandle, steps: f64) {
    with_viewer(viewer, |ctx| {
        ctx.widget_mut().zoom_step(steps);
        ctx.on_view_change();
    });
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn()>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

fn bind_window_events(viewer: ViewerHandle, redraw: Rc<dyn Fn()>) {
    use wasm_bindgen::prelude::*;
    let Some(window) = web_sys::window() else {
        return;
    };

    KEYDOWN_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.window.remove_event_listener_with_callback(
                "keydown",
                old._handler.as_ref().unchecked_ref(),
            );
        }
    });
    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.window.remove_event_listener_with_callback(
                "resize",
                old._handler.as_ref().unchecked_ref(),
            );
        }
    });

    let keydown = Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
        let Some(target) = e.target() else {
            return;
        };
        if target.dyn_ref::<web_sys::HtmlInputElement>().is_some() {
            return;
        }
        with_viewer(viewer, |ctx| {
            let widget = ctx.widget_mut();
            match e.key().as_str() {
                "ArrowLeft" => widget.pan(KEY_PAN_PX, 0.0),
                "ArrowRight" => widget.pan(-KEY_PAN_PX, 0.0),
                "ArrowUp" => widget.pan(0.0, KEY_PAN_PX),
                "ArrowDown" => widget.pan(0.0, -KEY_PAN_PX),
                "+" | "=" => widget.zoom_step(1.0),
                "-" => widget.zoom_step(-1.0),
                _ => return,
            }
            e.prevent_default();
            ctx.on_view_change();
        });
    });
    if window
        .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())
        .is_ok()
    {
        KEYDOWN_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(KeydownBinding {
                window: window.clone(),
                _handler: keydown,
            });
        });
    }

    let resize = Closure::<dyn Fn()>::new(move || redraw());
    if window
        .add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
        .is_ok()
    {
        RESIZE_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(ResizeBinding {
                window: window.clone(),
                _handler: resize,
            });
        });
    }
}

/// Canvas element plus pointer, wheel and keyboard wiring for the viewer.
///
/// `box_zoom_on` mirrors the box-zoom gesture state for the control panel.
#[component]
pub fn MapCanvas(
    viewer: ViewerHandle,
    canvas_ref: NodeRef<leptos::html::Canvas>,
    redraw: Rc<dyn Fn()>,
    box_zoom_on: RwSignal<bool>,
) -> impl IntoView {
    let is_dragging = Rc::new(Cell::new(false));
    let press_at = Rc::new(Cell::new(ScreenPoint::default()));
    let last = Rc::new(Cell::new(ScreenPoint::default()));

    bind_window_events(viewer, redraw);

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let at = local_point(canvas_ref, &e);
        with_viewer(viewer, |ctx| {
            ctx.widget_mut().zoom_at(e.delta_y(), at);
            ctx.on_view_change();
        });
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let press_at = press_at.clone();
        let last = last.clone();
        move |e: PointerEvent| {
            let at = local_point(canvas_ref, &e);
            press_at.set(at);
            last.set(at);
            let mut captured = false;
            with_viewer(viewer, |ctx| captured = ctx.box_zoom_mut().pointer_down(at));
            if !captured {
                is_dragging.set(true);
            }
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                if !captured {
                    el.style().set_property("cursor", "grabbing").ok();
                }
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last = last.clone();
        move |e: PointerEvent| {
            let at = local_point(canvas_ref, &e);
            with_viewer(viewer, |ctx| {
                if let Some(rect) = ctx.box_zoom_mut().pointer_move(at) {
                    ctx.widget_mut().set_zoom_box(Some(rect));
                } else if is_dragging.get() {
                    let prev = last.get();
                    ctx.widget_mut().pan(at.x - prev.x, at.y - prev.y);
                    ctx.on_view_change();
                } else {
                    ctx.widget_mut().set_hovered_at(at);
                }
            });
            last.set(at);
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            with_viewer(viewer, |ctx| {
                ctx.widget_mut().set_zoom_box(None);
                if let Some(rect) = ctx.box_zoom_mut().pointer_up() {
                    ctx.on_region_selected(rect);
                }
                box_zoom_on.set(ctx.box_zoom().is_active());
            });
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let press_at = press_at.clone();
        move |e: MouseEvent| {
            let at = local_point(canvas_ref, &e);
            let start = press_at.get();
            if (at.x - start.x).abs() < CLICK_SLOP_PX && (at.y - start.y).abs() < CLICK_SLOP_PX {
                with_viewer(viewer, |ctx| ctx.widget_mut().click_at(at));
            }
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:click=on_click
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}
