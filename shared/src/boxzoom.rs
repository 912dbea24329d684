/// Pixels of pointer travel swallowed before a drag box grows.
const DRAG_SLACK_PX: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in widget pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub origin: ScreenPoint,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn far_corner(&self) -> ScreenPoint {
        ScreenPoint::new(self.origin.x + self.width, self.origin.y + self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxZoomOptions {
    /// Width / height the drawn box is forced to.
    pub aspect_ratio: Option<f64>,
    /// Stay armed after a region has been selected.
    pub keep_on: bool,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    start: ScreenPoint,
    preview: Option<ScreenRect>,
}

/// Drag-a-box-to-zoom gesture.
///
/// While armed the widget routes pointer events here instead of panning; a finished drag
/// yields the selected region for the viewer to fit.
#[derive(Debug, Clone, Default)]
pub struct BoxZoom {
    options: BoxZoomOptions,
    active: bool,
    drag: Option<Drag>,
}

impl BoxZoom {
    pub fn new(options: BoxZoomOptions) -> Self {
        Self {
            options,
            active: false,
            drag: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start capturing pointer drags.
    pub fn set_state_on(&mut self) {
        self.active = true;
    }

    /// Stop capturing; any drag in progress is dropped.
    pub fn set_state_off(&mut self) {
        self.active = false;
        self.drag = None;
    }

    pub fn toggle(&mut self) {
        if self.active {
            self.set_state_off();
        } else {
            self.set_state_on();
        }
    }

    /// Returns whether the event was captured.
    pub fn pointer_down(&mut self, at: ScreenPoint) -> bool {
        if !self.active {
            return false;
        }
        self.drag = Some(Drag {
            start: at,
            preview: None,
        });
        true
    }

    /// Box to draw while dragging.
    pub fn pointer_move(&mut self, at: ScreenPoint) -> Option<ScreenRect> {
        let aspect_ratio = self.options.aspect_ratio;
        let drag = self.drag.as_mut()?;
        let rect = drag_rect(drag.start, at, aspect_ratio);
        drag.preview = Some(rect);
        Some(rect)
    }

    pub fn preview(&self) -> Option<ScreenRect> {
        self.drag.and_then(|d| d.preview)
    }

    /// Finish the drag; the drawn box is the selection, not the release point.
    pub fn pointer_up(&mut self) -> Option<ScreenRect> {
        let drag = self.drag.take()?;
        let rect = drag.preview.filter(|r| !r.is_degenerate())?;
        if !self.options.keep_on {
            self.set_state_off();
        }
        Some(rect)
    }
}

fn drag_rect(start: ScreenPoint, at: ScreenPoint, aspect_ratio: Option<f64>) -> ScreenRect {
    let width = ((at.x - start.x).abs() - DRAG_SLACK_PX).max(0.0);
    let mut height = ((at.y - start.y).abs() - DRAG_SLACK_PX).max(0.0);
    if let Some(ratio) = aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) {
        height = width / ratio;
    }
    ScreenRect {
        origin: ScreenPoint::new(start.x.min(at.x), start.y.min(at.y)),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_gesture_ignores_pointer() {
        let mut bz = BoxZoom::default();
        assert!(!bz.pointer_down(ScreenPoint::new(0.0, 0.0)));
        assert_eq!(bz.pointer_move(ScreenPoint::new(50.0, 50.0)), None);
        assert_eq!(bz.pointer_up(), None);
    }

    #[test]
    fn drag_selects_box_minus_slack_and_disarms() {
        let mut bz = BoxZoom::default();
        bz.set_state_on();
        assert!(bz.pointer_down(ScreenPoint::new(100.0, 100.0)));
        bz.pointer_move(ScreenPoint::new(40.0, 164.0));
        let rect = bz.pointer_up().expect("region should be selected");
        assert_eq!(rect.origin, ScreenPoint::new(40.0, 100.0));
        assert_eq!((rect.width, rect.height), (56.0, 60.0));
        assert_eq!(rect.far_corner(), ScreenPoint::new(96.0, 160.0));
        assert!(!bz.is_active());
    }

    #[test]
    fn aspect_ratio_drives_height() {
        let mut bz = BoxZoom::new(BoxZoomOptions {
            aspect_ratio: Some(2.0),
            keep_on: true,
        });
        bz.set_state_on();
        bz.pointer_down(ScreenPoint::new(0.0, 0.0));
        let preview = bz
            .pointer_move(ScreenPoint::new(104.0, 10.0))
            .expect("preview while dragging");
        assert_eq!((preview.width, preview.height), (100.0, 50.0));
        assert!(bz.pointer_up().is_some());
        assert!(bz.is_active());
    }

    #[test]
    fn click_without_drag_selects_nothing() {
        let mut bz = BoxZoom::default();
        bz.set_state_on();
        bz.pointer_down(ScreenPoint::new(10.0, 10.0));
        bz.pointer_move(ScreenPoint::new(12.0, 13.0));
        assert_eq!(bz.pointer_up(), None);
        assert!(bz.is_active());
    }

    #[test]
    fn toggling_off_drops_drag() {
        let mut bz = BoxZoom::default();
        bz.toggle();
        bz.pointer_down(ScreenPoint::new(0.0, 0.0));
        bz.pointer_move(ScreenPoint::new(50.0, 50.0));
        bz.toggle();
        assert_eq!(bz.preview(), None);
        assert_eq!(bz.pointer_up(), None);
    }
}
