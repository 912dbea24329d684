use mapshot_shared::boxzoom::ScreenPoint;
use mapshot_shared::{LatLng, LatLngBounds};

/// Zoom levels are kept on multiples of this step.
pub const ZOOM_SNAP: f64 = 0.1;
/// Wheel travel (in pixels) for one full zoom level.
const WHEEL_PX_PER_ZOOM_LEVEL: f64 = 60.0;

/// Camera over the projected plane.
///
/// Projected point `p` sits at pixel `(p.lng * 2^zoom, -p.lat * 2^zoom)`; the center of the
/// canvas shows `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LatLng::default(),
            zoom: 0.0,
            width: 0.0,
            height: 0.0,
            min_zoom: f64::NEG_INFINITY,
            max_zoom: f64::INFINITY,
        }
    }
}

pub fn snap_zoom(zoom: f64) -> f64 {
    (zoom / ZOOM_SNAP).round() * ZOOM_SNAP
}

impl Viewport {
    pub fn scale(&self) -> f64 {
        self.zoom.exp2()
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Limit the zoom range and pull the current zoom inside it.
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.clamp_zoom(self.zoom);
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return self.min_zoom.max(0.0).min(self.max_zoom);
        }
        snap_zoom(zoom).clamp(self.min_zoom, self.max_zoom)
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        self.zoom = self.clamp_zoom(zoom);
    }

    pub fn projected_to_screen(&self, p: LatLng) -> ScreenPoint {
        let s = self.scale();
        ScreenPoint::new(
            (p.lng - self.center.lng) * s + self.width / 2.0,
            (self.center.lat - p.lat) * s + self.height / 2.0,
        )
    }

    pub fn screen_to_projected(&self, pt: ScreenPoint) -> LatLng {
        let s = self.scale();
        LatLng::new(
            self.center.lat - (pt.y - self.height / 2.0) / s,
            self.center.lng + (pt.x - self.width / 2.0) / s,
        )
    }

    /// Projected area currently on screen.
    pub fn visible_bounds(&self) -> LatLngBounds {
        LatLngBounds::from_corners(
            self.screen_to_projected(ScreenPoint::new(0.0, 0.0)),
            self.screen_to_projected(ScreenPoint::new(self.width, self.height)),
        )
    }

    /// Wheel zoom that keeps the point under the cursor fixed.
    pub fn zoom_at(&mut self, wheel_delta_px: f64, at: ScreenPoint) {
        let target = self.clamp_zoom(self.zoom - wheel_delta_px / WHEEL_PX_PER_ZOOM_LEVEL);
        if target == self.zoom {
            return;
        }
        let anchor = self.screen_to_projected(at);
        self.zoom = target;
        let s = self.scale();
        self.center = LatLng::new(
            anchor.lat + (at.y - self.height / 2.0) / s,
            anchor.lng - (at.x - self.width / 2.0) / s,
        );
    }

    /// Pan by a screen-space delta; content follows the pointer.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let s = self.scale();
        self.center.lng -= dx / s;
        self.center.lat += dy / s;
    }

    /// Center on `bounds` at the largest snapped zoom that still shows all of it.
    pub fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.center = bounds.center();
        let span_x = bounds.north_east.lng - bounds.south_west.lng;
        let span_y = bounds.north_east.lat - bounds.south_west.lat;
        let fit_x = (span_x > 0.0 && self.width > 0.0).then(|| self.width / span_x);
        let fit_y = (span_y > 0.0 && self.height > 0.0).then(|| self.height / span_y);
        let fit = match (fit_x, fit_y) {
            (Some(x), Some(y)) => x.min(y),
            (Some(v), None) | (None, Some(v)) => v,
            (None, None) => return,
        };
        let zoom = (fit.log2() / ZOOM_SNAP).floor() * ZOOM_SNAP;
        self.zoom = self.clamp_zoom(zoom);
    }
}
