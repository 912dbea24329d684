use std::collections::BTreeMap;

use crate::annotations::OverlayKind;
use crate::query::QueryParams;

pub const KEY_SURFACE: &str = "s";
pub const KEY_X: &str = "x";
pub const KEY_Y: &str = "y";
pub const KEY_Z: &str = "z";
pub const KEY_PATH: &str = "path";
pub const KEY_LINK: &str = "l";

/// View state carried by the page URL.
///
/// Camera values are in world units of the surface named by `surface`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub surface: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Only overlays the URL says something about; the rest keep their default.
    pub overlays: BTreeMap<OverlayKind, bool>,
}

impl ViewState {
    pub fn decode(params: &QueryParams) -> Self {
        let mut overlays = BTreeMap::new();
        for kind in OverlayKind::ALL {
            if let Some(visible) = parse_flag(params.get(kind.query_key())) {
                overlays.insert(kind, visible);
            }
        }

        Self {
            surface: params
                .get(KEY_SURFACE)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            x: parse_number(params.get(KEY_X), 0.0),
            y: parse_number(params.get(KEY_Y), 0.0),
            z: parse_number(params.get(KEY_Z), 0.0),
            overlays,
        }
    }

    pub fn encode(&self, params: &mut QueryParams) {
        if let Some(surface) = &self.surface {
            encode_surface(params, surface);
        }
        encode_camera(params, self.x, self.y, self.z);
        for (&kind, &visible) in &self.overlays {
            encode_overlay(params, kind, visible);
        }
    }

    /// Visibility to apply for an overlay at startup, if the URL forces one.
    pub fn overlay(&self, kind: OverlayKind) -> Option<bool> {
        self.overlays.get(&kind).copied()
    }
}

pub fn encode_camera(params: &mut QueryParams, x: f64, y: f64, z: f64) {
    params.set(KEY_X, format_fixed1(x));
    params.set(KEY_Y, format_fixed1(y));
    params.set(KEY_Z, format_fixed1(z));
}

pub fn encode_surface(params: &mut QueryParams, surface_key: &str) {
    params.set(KEY_SURFACE, surface_key);
}

pub fn encode_overlay(params: &mut QueryParams, kind: OverlayKind, visible: bool) {
    params.set(kind.query_key(), if visible { "1" } else { "0" });
}

/// Lenient number parsing: missing, blank, malformed or non-finite values give `default`.
pub fn parse_number(raw: Option<&str>, default: f64) -> f64 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw {
        Some("0") => Some(false),
        Some("1") => Some(true),
        _ => None,
    }
}

/// One decimal place; negative zero is written as `0.0`.
pub fn format_fixed1(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{v:.1}")
}

/// Where to load `mapshot.json` and tiles from: the `path` parameter, else the host default.
/// A non-empty result always ends with `/`.
pub fn load_path(params: &QueryParams, default_path: &str) -> String {
    let mut path = params.get(KEY_PATH).unwrap_or(default_path).to_string();
    if !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Share-link id from the `l` parameter.
pub fn link_id(params: &QueryParams) -> Option<&str> {
    params.get(KEY_LINK).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_state() {
        let q = QueryParams::parse("?s=3&x=12.5&y=-40&z=2.3&lt=1&lg=0&ld=maybe");
        let state = ViewState::decode(&q);
        assert_eq!(state.surface.as_deref(), Some("3"));
        assert_eq!((state.x, state.y, state.z), (12.5, -40.0, 2.3));
        assert_eq!(state.overlay(OverlayKind::Stations), Some(true));
        assert_eq!(state.overlay(OverlayKind::Tags), Some(false));
        assert_eq!(state.overlay(OverlayKind::Debug), None);
    }

    #[test]
    fn malformed_numbers_fall_back_to_zero() {
        let q = QueryParams::parse("x=abc&y=&z=inf");
        let state = ViewState::decode(&q);
        assert_eq!((state.x, state.y, state.z), (0.0, 0.0, 0.0));
        assert_eq!(state.surface, None);
        assert!(state.overlays.is_empty());
    }

    #[test]
    fn parse_number_trims_and_defaults() {
        assert_eq!(parse_number(Some(" 7.25 "), 1.0), 7.25);
        assert_eq!(parse_number(None, 1.0), 1.0);
        assert_eq!(parse_number(Some("NaN"), 3.0), 3.0);
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut overlays = BTreeMap::new();
        overlays.insert(OverlayKind::Stations, false);
        overlays.insert(OverlayKind::Debug, true);
        let state = ViewState {
            surface: Some("platform-4".into()),
            x: -1234.56,
            y: 98.76,
            z: 3.14159,
            overlays,
        };

        let mut q = QueryParams::parse("?path=shots%2Fa");
        state.encode(&mut q);
        let decoded = ViewState::decode(&QueryParams::parse(&q.to_search()));

        assert_eq!(decoded.surface, state.surface);
        assert_eq!(format_fixed1(decoded.x), format_fixed1(state.x));
        assert_eq!(format_fixed1(decoded.y), format_fixed1(state.y));
        assert_eq!(format_fixed1(decoded.z), format_fixed1(state.z));
        assert_eq!(decoded.overlays, state.overlays);
        assert_eq!(q.get(KEY_PATH), Some("shots/a"));
    }

    #[test]
    fn camera_is_written_with_one_decimal() {
        let mut q = QueryParams::default();
        encode_camera(&mut q, 1.26, -0.04, 2.0);
        assert_eq!(q.to_query_string(), "x=1.3&y=-0.0&z=2.0");
        encode_camera(&mut q, -0.0, 0.0, -0.0);
        assert_eq!(q.to_query_string(), "x=0.0&y=0.0&z=0.0");
    }

    #[test]
    fn load_path_appends_trailing_slash() {
        assert_eq!(load_path(&QueryParams::parse("path=data/x"), "dflt/"), "data/x/");
        assert_eq!(load_path(&QueryParams::parse("path=data/x/"), ""), "data/x/");
        assert_eq!(load_path(&QueryParams::parse(""), "dflt"), "dflt/");
        assert_eq!(load_path(&QueryParams::parse(""), ""), "");
        assert_eq!(load_path(&QueryParams::parse("path="), "dflt/"), "");
    }

    #[test]
    fn link_id_ignores_empty() {
        assert_eq!(link_id(&QueryParams::parse("l=mysave")), Some("mysave"));
        assert_eq!(link_id(&QueryParams::parse("l=")), None);
    }
}
