use serde::{Deserialize, Serialize};

/// A position in world units. World y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const ORIGIN: WorldPos = WorldPos { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in world coordinates, as exported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left_top: WorldPos,
    pub right_bottom: WorldPos,
}

impl BoundingBox {
    /// Midpoint in world units. Always averaged before any projection.
    pub fn midpoint(&self) -> WorldPos {
        WorldPos {
            x: (self.left_top.x + self.right_bottom.x) / 2.0,
            y: (self.left_top.y + self.right_bottom.y) / 2.0,
        }
    }
}

/// A position in the map widget's projected space. `lat` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Projected rectangle given by two opposite corners, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// Per-surface conversion between world units and projected units.
///
/// `ratio = render_size / tile_size`: one tile of `tile_size` world units is drawn as
/// `render_size` projected units at zoom 0. Transforms of different surfaces are not
/// interchangeable even when their parameters match, so each surface builds its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    tile_size: f64,
    render_size: f64,
}

impl SurfaceTransform {
    /// Degenerate scale parameters (zero, negative, NaN) fall back to a 1:1 ratio so a broken
    /// document still yields a usable viewer.
    pub fn new(tile_size: f64, render_size: f64) -> Self {
        if !is_usable_scale(tile_size) || !is_usable_scale(render_size) {
            return Self {
                tile_size: 1.0,
                render_size: 1.0,
            };
        }
        Self {
            tile_size,
            render_size,
        }
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn render_size(&self) -> f64 {
        self.render_size
    }

    pub fn world_to_projected(&self, x: f64, y: f64) -> LatLng {
        let ratio = self.render_size / self.tile_size;
        LatLng {
            lat: -y * ratio,
            lng: x * ratio,
        }
    }

    pub fn projected_to_world(&self, p: LatLng) -> WorldPos {
        let ratio = self.tile_size / self.render_size;
        WorldPos {
            x: p.lng * ratio,
            y: -p.lat * ratio,
        }
    }

    pub fn project(&self, pos: WorldPos) -> LatLng {
        self.world_to_projected(pos.x, pos.y)
    }

    pub fn midpoint_to_projected(&self, bbox: &BoundingBox) -> LatLng {
        self.project(bbox.midpoint())
    }

    /// Projected bounds of the world rectangle spanned by two corners.
    pub fn bounds(&self, world_min: WorldPos, world_max: WorldPos) -> LatLngBounds {
        LatLngBounds::from_corners(self.project(world_min), self.project(world_max))
    }
}

fn is_usable_scale(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
