#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use mapshot_shared::boxzoom::ScreenRect;
use mapshot_shared::{LatLng, TileLayerDescriptor};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::viewport::Viewport;

/// Above this many cached images the cache is emptied before loading more.
const MAX_CACHED_TILES: usize = 768;
/// Never request more tiles than this for a single frame.
const MAX_TILES_PER_FRAME: usize = 1024;

/// One tile to draw, with its destination on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRef {
    pub z: i32,
    pub x: i64,
    pub y: i64,
    pub screen: ScreenRect,
}

/// Native pyramid level used at a view zoom.
pub fn native_zoom(view_zoom: f64, base: &TileLayerDescriptor) -> i32 {
    let lo = base.min_native_zoom.min(base.max_native_zoom);
    let hi = base.max_native_zoom.max(base.min_native_zoom);
    (view_zoom.round() as i32).clamp(lo, hi)
}

/// Tiles of `base` covering the visible part of its bounds.
pub fn visible_tiles(vp: &Viewport, base: &TileLayerDescriptor) -> Vec<TileRef> {
    if base.tile_size <= 0.0 || vp.width <= 0.0 || vp.height <= 0.0 {
        return Vec::new();
    }
    let view = vp.visible_bounds();
    let west = view.south_west.lng.max(base.bounds.south_west.lng);
    let east = view.north_east.lng.min(base.bounds.north_east.lng);
    let south = view.south_west.lat.max(base.bounds.south_west.lat);
    let north = view.north_east.lat.min(base.bounds.north_east.lat);
    if west >= east || south >= north {
        return Vec::new();
    }

    let z = native_zoom(vp.zoom, base);
    let native_scale = f64::from(z).exp2();
    let ts = base.tile_size;
    // Tile pixel space at the native level: x grows with lng, y grows with -lat.
    let x_min = (west * native_scale / ts).floor() as i64;
    let x_max = (east * native_scale / ts).ceil() as i64 - 1;
    let y_min = (-north * native_scale / ts).floor() as i64;
    let y_max = (-south * native_scale / ts).ceil() as i64 - 1;

    let count = (x_max - x_min + 1).max(0) as usize * (y_max - y_min + 1).max(0) as usize;
    if count > MAX_TILES_PER_FRAME {
        return Vec::new();
    }

    let size = ts * (vp.zoom - f64::from(z)).exp2();
    let mut tiles = Vec::with_capacity(count);
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let top_left = LatLng::new(
                -(y as f64) * ts / native_scale,
                x as f64 * ts / native_scale,
            );
            tiles.push(TileRef {
                z,
                x,
                y,
                screen: ScreenRect {
                    origin: vp.projected_to_screen(top_left),
                    width: size,
                    height: size,
                },
            });
        }
    }
    tiles
}

struct CachedTile {
    image: HtmlImageElement,
    loaded: Rc<Cell<bool>>,
    _onload: Closure<dyn FnMut()>,
}

/// Image elements for tile URLs, loaded on first request.
pub struct TileCache {
    tiles: HashMap<String, CachedTile>,
    on_ready: Rc<dyn Fn()>,
}

impl TileCache {
    /// `on_ready` runs whenever a requested image finishes loading.
    pub fn new(on_ready: Rc<dyn Fn()>) -> Self {
        Self {
            tiles: HashMap::new(),
            on_ready,
        }
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// The image for `url` once it has loaded; starts loading it otherwise.
    pub fn get_or_load(&mut self, url: &str) -> Option<HtmlImageElement> {
        if let Some(tile) = self.tiles.get(url) {
            return tile.loaded.get().then(|| tile.image.clone());
        }
        if self.tiles.len() >= MAX_CACHED_TILES {
            self.tiles.clear();
        }

        let image = HtmlImageElement::new().ok()?;
        let loaded = Rc::new(Cell::new(false));
        let onload = {
            let loaded = loaded.clone();
            let on_ready = self.on_ready.clone();
            Closure::<dyn FnMut()>::new(move || {
                loaded.set(true);
                on_ready();
            })
        };
        image.set_onload(Some(onload.as_ref().unchecked_ref()));
        image.set_src(url);
        self.tiles.insert(
            url.to_string(),
            CachedTile {
                image,
                loaded,
                _onload: onload,
            },
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapshot_shared::LatLngBounds;
    use mapshot_shared::boxzoom::ScreenPoint;

    fn descriptor() -> TileLayerDescriptor {
        // 32 world units per tile rendered at 1024px: world -64..64 spans -2048..2048.
        TileLayerDescriptor {
            url_template: "d-nauvis-{z}/tile_{x}_{y}.jpg".to_string(),
            tile_size: 1024.0,
            bounds: LatLngBounds::from_corners(
                LatLng::new(2048.0, -2048.0),
                LatLng::new(-2048.0, 2048.0),
            ),
            min_native_zoom: 0,
            max_native_zoom: 3,
            min_zoom: -4,
            max_zoom: 7,
        }
    }

    fn viewport(width: f64, height: f64, zoom: f64) -> Viewport {
        let mut vp = Viewport::default();
        vp.resize(width, height);
        vp.set_view(LatLng::default(), zoom);
        vp
    }

    #[test]
    fn native_zoom_rounds_and_clamps() {
        let base = descriptor();
        assert_eq!(native_zoom(1.4, &base), 1);
        assert_eq!(native_zoom(1.6, &base), 2);
        assert_eq!(native_zoom(-3.0, &base), 0);
        assert_eq!(native_zoom(6.0, &base), 3);
    }

    #[test]
    fn whole_surface_at_level_zero() {
        let tiles = visible_tiles(&viewport(8000.0, 8000.0, 0.0), &descriptor());
        assert_eq!(tiles.len(), 16);
        let first = &tiles[0];
        assert_eq!((first.z, first.x, first.y), (0, -2, -2));
        assert_eq!(first.screen.origin, ScreenPoint::new(1952.0, 1952.0));
        assert_eq!(first.screen.width, 1024.0);
    }

    #[test]
    fn overzoom_scales_native_tiles() {
        let tiles = visible_tiles(&viewport(512.0, 512.0, 4.0), &descriptor());
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.z == 3 && t.screen.width == 2048.0));
    }

    #[test]
    fn nothing_outside_bounds() {
        let mut vp = viewport(100.0, 100.0, 0.0);
        vp.set_view(LatLng::new(0.0, 10_000.0), 0.0);
        assert!(visible_tiles(&vp, &descriptor()).is_empty());
    }

    #[test]
    fn url_substitution_matches_tile_coordinates() {
        let tiles = visible_tiles(&viewport(100.0, 100.0, 0.0), &descriptor());
        let urls: Vec<String> = tiles
            .iter()
            .map(|t| descriptor().tile_url(t.z, t.x, t.y))
            .collect();
        assert_eq!(
            urls,
            vec![
                "d-nauvis-0/tile_-1_-1.jpg",
                "d-nauvis-0/tile_0_-1.jpg",
                "d-nauvis-0/tile_-1_0.jpg",
                "d-nauvis-0/tile_0_0.jpg",
            ]
        );
    }
}
