use std::cmp::Ordering;
use std::collections::HashMap;

use crate::annotations::{SurfaceOverlays, build_overlays};
use crate::coords::{LatLngBounds, SurfaceTransform};
use crate::snapshot::{MapshotDocument, Surface};

/// Native zoom levels can be over/under-zoomed by this many steps.
pub const ZOOM_OVERSCAN: i32 = 4;

const PLATFORM_PREFIX: &str = "platform-";

/// Everything the tiled-image widget needs to show one surface's base imagery.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerDescriptor {
    /// `{z}`, `{x}` and `{y}` are left for the widget to substitute.
    pub url_template: String,
    pub tile_size: f64,
    pub bounds: LatLngBounds,
    pub min_native_zoom: i32,
    pub max_native_zoom: i32,
    pub min_zoom: i32,
    pub max_zoom: i32,
}

impl TileLayerDescriptor {
    pub fn new(load_path: &str, surface: &Surface, transform: &SurfaceTransform) -> Self {
        Self {
            url_template: format!("{load_path}{}{{z}}/tile_{{x}}_{{y}}.jpg", surface.file_prefix),
            tile_size: transform.render_size(),
            bounds: transform.bounds(surface.world_min, surface.world_max),
            min_native_zoom: surface.zoom_min,
            max_native_zoom: surface.zoom_max,
            min_zoom: surface.zoom_min - ZOOM_OVERSCAN,
            max_zoom: surface.zoom_max + ZOOM_OVERSCAN,
        }
    }

    pub fn tile_url(&self, z: i32, x: i64, y: i64) -> String {
        self.url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

/// Runtime objects derived from one surface.
#[derive(Debug, Clone)]
pub struct SurfaceEntry {
    pub surface: Surface,
    pub transform: SurfaceTransform,
    pub base: TileLayerDescriptor,
    pub overlays: SurfaceOverlays,
}

impl SurfaceEntry {
    pub fn name(&self) -> &str {
        &self.surface.surface_name
    }

    /// Value written to the `s` query key for this surface.
    pub fn key(&self) -> String {
        self.surface.surface_idx.to_string()
    }
}

/// Presentation grouping of surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCategory {
    Surfaces,
    Platforms,
}

impl SurfaceCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Surfaces => "Surfaces",
            Self::Platforms => "Platforms",
        }
    }
}

/// All surfaces of one document, addressable by `surface_idx` (as text) and by name.
///
/// Built wholesale from a normalized document and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SurfaceRegistry {
    entries: Vec<SurfaceEntry>,
    by_key: HashMap<String, usize>,
}

impl SurfaceRegistry {
    /// `load_path` must already end with `/` (or be empty).
    pub fn build(doc: &MapshotDocument, load_path: &str) -> Self {
        let mut entries = Vec::with_capacity(doc.surfaces.len());
        let mut by_key = HashMap::with_capacity(doc.surfaces.len() * 2);

        for (pos, surface) in doc.surfaces.iter().enumerate() {
            let transform = surface.transform();
            // First occurrence wins on duplicate keys.
            by_key.entry(surface.surface_idx.to_string()).or_insert(pos);
            by_key.entry(surface.surface_name.clone()).or_insert(pos);
            entries.push(SurfaceEntry {
                base: TileLayerDescriptor::new(load_path, surface, &transform),
                overlays: build_overlays(surface, &transform),
                transform,
                surface: surface.clone(),
            });
        }

        Self { entries, by_key }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    pub fn get(&self, pos: usize) -> Option<&SurfaceEntry> {
        self.entries.get(pos)
    }

    /// Position of the surface with this index or name.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn lookup(&self, key: &str) -> Option<&SurfaceEntry> {
        self.position(key).and_then(|pos| self.entries.get(pos))
    }

    /// Resolve a possibly missing or stale key; anything unknown maps to the first surface.
    pub fn resolve_position(&self, key: Option<&str>) -> usize {
        key.and_then(|k| self.position(k)).unwrap_or(0)
    }

    /// Positions in presentation order, see [`compare_surface_names`].
    pub fn display_order(&self, pinned_last: Option<&str>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| {
            compare_surface_names(self.entries[a].name(), self.entries[b].name(), pinned_last)
        });
        order
    }

    /// Display order split into categories; empty categories are left out.
    pub fn categories(&self, pinned_last: Option<&str>) -> Vec<(SurfaceCategory, Vec<usize>)> {
        let mut surfaces = Vec::new();
        let mut platforms = Vec::new();
        for pos in self.display_order(pinned_last) {
            match platform_number(self.entries[pos].name()) {
                Some(_) => platforms.push(pos),
                None => surfaces.push(pos),
            }
        }
        [
            (SurfaceCategory::Surfaces, surfaces),
            (SurfaceCategory::Platforms, platforms),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .collect()
    }
}

/// `platform-<n>` names yield `n`.
pub fn platform_number(name: &str) -> Option<u64> {
    name.strip_prefix(PLATFORM_PREFIX)?.parse().ok()
}

/// Presentation order of surface names.
///
/// Named surfaces come first, alphabetically and case-insensitively, with `pinned_last` (when
/// present) after all of them. Platforms follow, ascending by number.
pub fn compare_surface_names(a: &str, b: &str, pinned_last: Option<&str>) -> Ordering {
    match (platform_number(a), platform_number(b)) {
        (Some(na), Some(nb)) => na.cmp(&nb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => {
            let pinned_a = pinned_last == Some(a);
            let pinned_b = pinned_last == Some(b);
            pinned_a
                .cmp(&pinned_b)
                .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
                .then_with(|| a.cmp(b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::WorldPos;
    use crate::snapshot::parse_document;

    fn surface(name: &str, idx: i64) -> Surface {
        Surface {
            surface_name: name.to_string(),
            surface_idx: idx,
            file_prefix: format!("d-{name}-"),
            tile_size: 32.0,
            render_size: 512.0,
            world_min: WorldPos::new(-64.0, -64.0),
            world_max: WorldPos::new(64.0, 64.0),
            zoom_min: 0,
            zoom_max: 4,
            player: None,
            players: Default::default(),
            stations: Default::default(),
            tags: Default::default(),
        }
    }

    fn document(names: &[&str]) -> MapshotDocument {
        MapshotDocument {
            unique_id: "u".into(),
            savename: "s".into(),
            tick: 0,
            ticks_played: 0,
            seed: 0,
            map_exchange: None,
            map_id: String::new(),
            surfaces: names
                .iter()
                .enumerate()
                .map(|(i, n)| surface(n, i as i64 + 1))
                .collect(),
        }
    }

    #[test]
    fn lookup_by_idx_and_name_agree() {
        let registry = SurfaceRegistry::build(&document(&["nauvis", "vulcanus", "platform-3"]), "");
        for entry in registry.entries() {
            let by_idx = registry.lookup(&entry.key()).expect("idx lookup");
            let by_name = registry.lookup(entry.name()).expect("name lookup");
            assert_eq!(by_idx.name(), entry.name());
            assert_eq!(by_name.key(), entry.key());
        }
    }

    #[test]
    fn unknown_or_missing_key_resolves_to_first_surface() {
        let registry = SurfaceRegistry::build(&document(&["vulcanus", "nauvis"]), "");
        assert_eq!(registry.resolve_position(Some("gleba")), 0);
        assert_eq!(registry.resolve_position(Some("99")), 0);
        assert_eq!(registry.resolve_position(None), 0);
        assert_eq!(registry.resolve_position(Some("nauvis")), 1);
        assert_eq!(registry.resolve_position(Some("2")), 1);
    }

    #[test]
    fn tile_template_uses_load_path_and_prefix() {
        let registry = SurfaceRegistry::build(&document(&["nauvis"]), "/data/save/v1/");
        let base = &registry.entries()[0].base;
        assert_eq!(
            base.url_template,
            "/data/save/v1/d-nauvis-{z}/tile_{x}_{y}.jpg"
        );
        assert_eq!(base.tile_url(3, -1, 2), "/data/save/v1/d-nauvis-3/tile_-1_2.jpg");
        assert_eq!((base.min_zoom, base.max_zoom), (-4, 8));
        assert_eq!(base.tile_size, 512.0);
    }

    #[test]
    fn legacy_document_builds_single_entry() {
        let doc = parse_document(r#"{"tile_size": 32, "render_size": 1024}"#).expect("legacy");
        let registry = SurfaceRegistry::build(&doc, "shots/");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("1").map(|e| e.name()), Some("nauvis"));
        assert_eq!(
            registry.entries()[0].base.url_template,
            "shots/zoom_{z}/tile_{x}_{y}.jpg"
        );
    }

    #[test]
    fn platforms_sort_numerically_after_named_surfaces() {
        let registry = SurfaceRegistry::build(
            &document(&["nauvis", "platform-2", "platform-10", "platform-1"]),
            "",
        );
        let names: Vec<&str> = registry
            .display_order(None)
            .into_iter()
            .map(|pos| registry.entries()[pos].name())
            .collect();
        assert_eq!(names, vec!["nauvis", "platform-1", "platform-2", "platform-10"]);
    }

    #[test]
    fn named_surfaces_are_case_insensitive_with_pinned_last() {
        let mut names = vec!["Vulcanus", "aquilo", "nauvis", "Gleba", "platform-1"];
        names.sort_by(|a, b| compare_surface_names(a, b, Some("aquilo")));
        assert_eq!(names, vec!["Gleba", "nauvis", "Vulcanus", "aquilo", "platform-1"]);
    }

    #[test]
    fn categories_group_platforms_separately() {
        let registry =
            SurfaceRegistry::build(&document(&["platform-7", "nauvis", "fulgora"]), "");
        let categories = registry.categories(None);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].0, SurfaceCategory::Surfaces);
        assert_eq!(categories[0].1, vec![2, 1]);
        assert_eq!(categories[1].0, SurfaceCategory::Platforms);
        assert_eq!(categories[1].1, vec![0]);
    }

    #[test]
    fn ordering_does_not_affect_keys() {
        let registry = SurfaceRegistry::build(&document(&["platform-2", "nauvis"]), "");
        assert_eq!(registry.position("1"), Some(0));
        assert_eq!(registry.position("nauvis"), Some(1));
    }
}
