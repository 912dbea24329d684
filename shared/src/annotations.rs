use serde::{Deserialize, Serialize};

use crate::coords::{LatLng, SurfaceTransform, WorldPos};
use crate::rich_text::{LabelSegment, parse_rich_text};
use crate::snapshot::Surface;

/// The three toggleable annotation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayKind {
    Stations,
    Tags,
    Debug,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [Self::Stations, Self::Tags, Self::Debug];

    /// Query-string key holding this overlay's visibility.
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Stations => "lt",
            Self::Tags => "lg",
            Self::Debug => "ld",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Stations => "Train stations",
            Self::Tags => "Tags",
            Self::Debug => "Debug",
        }
    }

    /// Overlays start hidden unless the URL asks for them.
    pub const fn default_visible(self) -> bool {
        false
    }
}

/// How a marker's label is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelMode {
    /// Always drawn next to the marker.
    Permanent,
    /// Shown only when the marker is picked.
    Popup,
    /// Hover title only.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLng,
    pub title: String,
    pub label: Vec<LabelSegment>,
    pub label_mode: LabelMode,
}

impl Marker {
    fn permanent(position: LatLng, title: String) -> Self {
        Self {
            label: parse_rich_text(&title),
            position,
            title,
            label_mode: LabelMode::Permanent,
        }
    }

    fn popup(position: LatLng, title: &str, popup: &str) -> Self {
        Self {
            position,
            title: title.to_string(),
            label: parse_rich_text(popup),
            label_mode: LabelMode::Popup,
        }
    }

    fn titled(position: LatLng, title: String) -> Self {
        Self {
            position,
            title,
            label: Vec::new(),
            label_mode: LabelMode::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceOverlays {
    pub stations: Vec<Marker>,
    pub tags: Vec<Marker>,
    pub debug: Vec<Marker>,
}

impl SurfaceOverlays {
    pub fn markers(&self, kind: OverlayKind) -> &[Marker] {
        match kind {
            OverlayKind::Stations => &self.stations,
            OverlayKind::Tags => &self.tags,
            OverlayKind::Debug => &self.debug,
        }
    }
}

/// Build all overlay groups for one surface, positioned with that surface's transform.
pub fn build_overlays(surface: &Surface, transform: &SurfaceTransform) -> SurfaceOverlays {
    SurfaceOverlays {
        stations: station_markers(surface, transform),
        tags: tag_markers(surface, transform),
        debug: debug_markers(surface, transform),
    }
}

fn station_markers(surface: &Surface, transform: &SurfaceTransform) -> Vec<Marker> {
    surface
        .stations
        .iter()
        .map(|station| {
            Marker::permanent(
                transform.midpoint_to_projected(&station.bounding_box),
                station.backer_name.clone(),
            )
        })
        .collect()
}

fn tag_markers(surface: &Surface, transform: &SurfaceTransform) -> Vec<Marker> {
    surface
        .tags
        .iter()
        .map(|tag| {
            Marker::permanent(
                transform.project(tag.position),
                format!("{}: {}", tag.force_name, tag.text),
            )
        })
        .collect()
}

fn debug_markers(surface: &Surface, transform: &SurfaceTransform) -> Vec<Marker> {
    let mut markers = vec![Marker::popup(
        transform.project(WorldPos::ORIGIN),
        "Start",
        "Starting point",
    )];

    if !surface.players.is_empty() {
        markers.extend(
            surface
                .players
                .iter()
                .map(|p| Marker::popup(transform.project(p.position), &p.name, &p.name)),
        );
    } else if let Some(player) = surface.player {
        markers.push(Marker::popup(transform.project(player), "Player", "Player"));
    }

    let (min, max) = (surface.world_min, surface.world_max);
    for corner in [
        WorldPos::new(min.x, min.y),
        WorldPos::new(min.x, max.y),
        WorldPos::new(max.x, min.y),
        WorldPos::new(max.x, max.y),
    ] {
        markers.push(Marker::titled(
            transform.project(corner),
            format!("{}, {}", corner.x, corner.y),
        ));
    }
    markers
}
