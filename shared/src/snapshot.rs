use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::Annotations;
use crate::coords::{BoundingBox, SurfaceTransform, WorldPos};

/// Surface name given to the single surface of a legacy document.
pub const LEGACY_SURFACE_NAME: &str = "nauvis";
pub const LEGACY_SURFACE_IDX: i64 = 1;
pub const LEGACY_FILE_PREFIX: &str = "zoom_";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid mapshot.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mapshot.json declares an empty surface list")]
    NoSurfaces,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub backer_name: String,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub force_name: String,
    #[serde(default)]
    pub text: String,
    pub position: WorldPos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub name: String,
    pub position: WorldPos,
}

/// One independently tiled map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub surface_name: String,
    pub surface_idx: i64,
    pub file_prefix: String,
    /// Size of a tile in world units for the least detailed layer.
    #[serde(default)]
    pub tile_size: f64,
    /// Size of a tile in pixels.
    #[serde(default)]
    pub render_size: f64,
    #[serde(default)]
    pub world_min: WorldPos,
    #[serde(default)]
    pub world_max: WorldPos,
    #[serde(default)]
    pub zoom_min: i32,
    #[serde(default)]
    pub zoom_max: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<WorldPos>,
    #[serde(default)]
    pub players: Annotations<Player>,
    #[serde(default)]
    pub stations: Annotations<Station>,
    #[serde(default)]
    pub tags: Annotations<Tag>,
}

impl Surface {
    pub fn transform(&self) -> SurfaceTransform {
        SurfaceTransform::new(self.tile_size, self.render_size)
    }
}

/// Canonical snapshot document: metadata plus a non-empty, ordered surface list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapshotDocument {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub savename: String,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub ticks_played: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_exchange: Option<String>,
    #[serde(default)]
    pub map_id: String,
    pub surfaces: Vec<Surface>,
}

impl MapshotDocument {
    pub fn surface_names(&self) -> impl Iterator<Item = &str> {
        self.surfaces.iter().map(|s| s.surface_name.as_str())
    }
}

/// Document as found on disk, in either schema version.
///
/// Legacy documents have no `surfaces` and carry a single surface's fields at the root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub savename: String,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub ticks_played: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub map_exchange: Option<String>,
    #[serde(default)]
    pub map_id: String,
    #[serde(default)]
    pub surfaces: Option<Vec<Surface>>,

    #[serde(default)]
    pub tile_size: f64,
    #[serde(default)]
    pub render_size: f64,
    #[serde(default)]
    pub world_min: WorldPos,
    #[serde(default)]
    pub world_max: WorldPos,
    #[serde(default)]
    pub zoom_min: i32,
    #[serde(default)]
    pub zoom_max: i32,
    #[serde(default)]
    pub player: Option<WorldPos>,
    #[serde(default)]
    pub players: Annotations<Player>,
    #[serde(default)]
    pub stations: Annotations<Station>,
    #[serde(default)]
    pub tags: Annotations<Tag>,
}

/// Upgrade a document of any schema version to the canonical multi-surface form.
///
/// Documents that already list their surfaces pass through with those surfaces untouched;
/// root-level surface fields are ignored for them.
pub fn normalize(raw: RawDocument) -> Result<MapshotDocument, SnapshotError> {
    let surfaces = match raw.surfaces {
        Some(surfaces) if surfaces.is_empty() => return Err(SnapshotError::NoSurfaces),
        Some(surfaces) => surfaces,
        None => vec![Surface {
            surface_name: LEGACY_SURFACE_NAME.to_string(),
            surface_idx: LEGACY_SURFACE_IDX,
            file_prefix: LEGACY_FILE_PREFIX.to_string(),
            tile_size: raw.tile_size,
            render_size: raw.render_size,
            world_min: raw.world_min,
            world_max: raw.world_max,
            zoom_min: raw.zoom_min,
            zoom_max: raw.zoom_max,
            player: raw.player,
            players: raw.players,
            stations: raw.stations,
            tags: raw.tags,
        }],
    };

    Ok(MapshotDocument {
        unique_id: raw.unique_id,
        savename: raw.savename,
        tick: raw.tick,
        ticks_played: raw.ticks_played,
        seed: raw.seed,
        map_exchange: raw.map_exchange,
        map_id: raw.map_id,
        surfaces,
    })
}

/// Parse and normalize a `mapshot.json` payload.
pub fn parse_document(json: &str) -> Result<MapshotDocument, SnapshotError> {
    let raw: RawDocument = serde_json::from_str(json)?;
    normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "unique_id": "abc",
        "savename": "mysave",
        "tick": 1200,
        "ticks_played": 3600,
        "seed": 42,
        "map_id": "m1",
        "tile_size": 32,
        "render_size": 1024,
        "world_min": {"x": -64, "y": -32},
        "world_max": {"x": 64, "y": 96},
        "zoom_min": 0,
        "zoom_max": 5,
        "player": {"x": 1.5, "y": -2.5},
        "stations": [
            {"backer_name": "Iron", "bounding_box": {"left_top": {"x": 0, "y": 0}, "right_bottom": {"x": 2, "y": 2}}}
        ],
        "tags": {}
    }"#;

    const CANONICAL: &str = r#"{
        "unique_id": "xyz",
        "savename": "space",
        "tick": 10,
        "ticks_played": 20,
        "seed": 7,
        "map_id": "m2",
        "surfaces": [
            {
                "surface_name": "nauvis", "surface_idx": 1, "file_prefix": "d-nauvis-",
                "tile_size": 32, "render_size": 512,
                "world_min": {"x": 0, "y": 0}, "world_max": {"x": 10, "y": 10},
                "zoom_min": 0, "zoom_max": 3,
                "players": [{"name": "alice", "position": {"x": 3, "y": 4}}]
            },
            {
                "surface_name": "platform-2", "surface_idx": 5, "file_prefix": "d-platform-2-",
                "tile_size": 16, "render_size": 512,
                "world_min": {"x": -5, "y": -5}, "world_max": {"x": 5, "y": 5},
                "zoom_min": 1, "zoom_max": 2,
                "stations": {}
            }
        ]
    }"#;

    #[test]
    fn legacy_document_becomes_single_nauvis_surface() {
        let doc = parse_document(LEGACY).expect("legacy document should parse");
        assert_eq!(doc.savename, "mysave");
        assert_eq!(doc.ticks_played, 3600);
        assert_eq!(doc.surfaces.len(), 1);

        let surface = &doc.surfaces[0];
        assert_eq!(surface.surface_name, "nauvis");
        assert_eq!(surface.surface_idx, 1);
        assert_eq!(surface.file_prefix, "zoom_");
        assert_eq!(surface.tile_size, 32.0);
        assert_eq!(surface.render_size, 1024.0);
        assert_eq!(surface.world_min, WorldPos::new(-64.0, -32.0));
        assert_eq!(surface.world_max, WorldPos::new(64.0, 96.0));
        assert_eq!((surface.zoom_min, surface.zoom_max), (0, 5));
        assert_eq!(surface.player, Some(WorldPos::new(1.5, -2.5)));
        assert_eq!(surface.stations.len(), 1);
        assert_eq!(surface.stations[0].backer_name, "Iron");
        assert!(surface.tags.is_empty());
        assert!(surface.players.is_empty());
    }

    #[test]
    fn legacy_missing_fields_stay_absent() {
        let doc = parse_document(r#"{"unique_id": "bare"}"#).expect("bare document should parse");
        let surface = &doc.surfaces[0];
        assert_eq!(surface.player, None);
        assert!(surface.stations.is_empty());
        assert_eq!(surface.tile_size, 0.0);
    }

    #[test]
    fn canonical_document_passes_through() {
        let doc = parse_document(CANONICAL).expect("canonical document should parse");
        assert_eq!(
            doc.surface_names().collect::<Vec<_>>(),
            vec!["nauvis", "platform-2"]
        );
        assert_eq!(doc.surfaces[1].surface_idx, 5);
        assert_eq!(doc.surfaces[1].file_prefix, "d-platform-2-");
        assert_eq!(doc.surfaces[0].players[0].name, "alice");

        let reencoded = serde_json::to_string(&doc).expect("document should serialize");
        let again = parse_document(&reencoded).expect("re-encoded document should parse");
        assert_eq!(again, doc);
    }

    #[test]
    fn empty_surface_list_is_rejected() {
        let err = parse_document(r#"{"surfaces": []}"#).expect_err("empty list must fail");
        assert!(matches!(err, SnapshotError::NoSurfaces));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            parse_document("not json"),
            Err(SnapshotError::Json(_))
        ));
    }
}
