use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mapshot_shared::registry::compare_surface_names;
use mapshot_shared::{LinkTarget, ShotsJson, ShotsJsonInfo, ShotsJsonSave, parse_document};
use tracing::{info, warn};

use crate::config::MAPSHOT_FILE_NAME;

/// HTTP prefix under which shot directories are served.
pub const DATA_PREFIX: &str = "/data/";

/// One rendered mapshot found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotInfo {
    /// Directory relative to the scan root, slash separated.
    pub name: String,
    /// `name` without its last segment, `.` for shots at the root.
    pub savename: String,
    /// HTTP path of the shot directory, ending with `/`.
    pub path: String,
    pub fs_path: PathBuf,
    pub ticks_played: u64,
    /// Surface names in display order.
    pub surfaces: Vec<String>,
}

/// Walk `base_dir` for `mapshot.json` files.
///
/// Only a failure to read the root itself is an error; bad documents and unreadable
/// subdirectories are logged and skipped.
pub fn find_shots(base_dir: &Path) -> io::Result<Vec<ShotInfo>> {
    let root = std::fs::canonicalize(base_dir)?;
    info!(root = %root.display(), "looking for mapshots");
    // Surface the root error now instead of returning an empty scan.
    std::fs::read_dir(&root)?;

    let mut shots = Vec::new();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
        let mut entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries.filter_map(Result::ok).collect::<Vec<_>>(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if entry.file_name() == MAPSHOT_FILE_NAME
                && let Some(shot) = read_shot(&root, &path)
            {
                shots.push(shot);
            }
        }
    }

    Ok(shots)
}

fn read_shot(root: &Path, file: &Path) -> Option<ShotInfo> {
    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "mapshot.json is not readable");
            return None;
        }
    };
    let doc = match parse_document(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "mapshot.json is not a valid mapshot");
            return None;
        }
    };

    let fs_path = file.parent()?.to_path_buf();
    let rel = fs_path.strip_prefix(root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    // A mapshot.json at the root has no directory to serve it from.
    if segments.is_empty() {
        warn!(file = %file.display(), "ignoring mapshot.json at the scan root");
        return None;
    }

    let name = segments.join("/");
    let savename = match segments.split_last() {
        Some((_, parents)) if !parents.is_empty() => parents.join("/"),
        _ => ".".to_string(),
    };

    let mut surfaces: Vec<String> = doc.surface_names().map(str::to_string).collect();
    surfaces.sort_by(|a, b| compare_surface_names(a, b, None));

    info!(%name, ticks_played = doc.ticks_played, "found mapshot");
    Some(ShotInfo {
        path: format!("{DATA_PREFIX}{name}/"),
        name,
        savename,
        fs_path,
        ticks_played: doc.ticks_played,
        surfaces,
    })
}

/// Percent-encode every segment of an HTTP path, keeping the separators.
pub fn encode_path(path: &str) -> Option<String> {
    let mut url = reqwest::Url::parse("http://localhost/").ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.clear();
        segments.extend(path.trim_start_matches('/').split('/'));
    }
    Some(url.path().to_string())
}

/// Everything the HTTP layer serves about discovered shots, rebuilt wholesale per scan.
#[derive(Debug, Clone)]
pub struct ShotIndex {
    pub generation: u64,
    pub scanned_at: Option<DateTime<Utc>>,
    /// Sorted by `ticks_played` descending.
    pub shots: Vec<ShotInfo>,
    pub save_count: usize,
    pub listing_json: Arc<Bytes>,
    /// Pre-serialized `/latest/<savename>` answers.
    pub latest: HashMap<String, Arc<Bytes>>,
}

impl Default for ShotIndex {
    fn default() -> Self {
        Self {
            generation: 0,
            scanned_at: None,
            shots: Vec::new(),
            save_count: 0,
            listing_json: Arc::new(Bytes::from_static(br#"{"all":[]}"#)),
            latest: HashMap::new(),
        }
    }
}

impl ShotIndex {
    pub fn build(mut shots: Vec<ShotInfo>, generation: u64) -> Result<Self, serde_json::Error> {
        shots.sort_by(|a, b| {
            b.ticks_played
                .cmp(&a.ticks_played)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut by_save: BTreeMap<&str, Vec<&ShotInfo>> = BTreeMap::new();
        for shot in &shots {
            by_save.entry(shot.savename.as_str()).or_default().push(shot);
        }

        let listing = ShotsJson {
            all: by_save
                .iter()
                .map(|(savename, versions)| ShotsJsonSave {
                    savename: savename.to_string(),
                    versions: versions
                        .iter()
                        .map(|shot| ShotsJsonInfo {
                            name: shot.name.clone(),
                            path: shot.path.clone(),
                            ticks_played: shot.ticks_played,
                            surface: shot.surfaces.join(", "),
                        })
                        .collect(),
                })
                .collect(),
        };
        let listing_json = Arc::new(Bytes::from(serde_json::to_vec(&listing)?));

        let mut latest = HashMap::with_capacity(by_save.len());
        for (savename, versions) in &by_save {
            let Some(newest) = versions.first() else {
                continue;
            };
            let target = LinkTarget {
                encoded_path: encode_path(&newest.path),
                path: Some(newest.path.clone()),
            };
            latest.insert(
                savename.to_string(),
                Arc::new(Bytes::from(serde_json::to_vec(&target)?)),
            );
        }

        let save_count = by_save.len();
        Ok(Self {
            generation,
            scanned_at: Some(Utc::now()),
            shots,
            save_count,
            listing_json,
            latest,
        })
    }

    pub fn etag(&self) -> String {
        format!("\"shots-{}\"", self.generation)
    }

    /// Split a `/data/` request path into the shot owning it and the file within it.
    ///
    /// The longest matching shot name wins so nested shots stay reachable.
    pub fn resolve_data_path<'a>(&self, rest: &'a str) -> Option<(&ShotInfo, &'a str)> {
        self.shots
            .iter()
            .filter_map(|shot| {
                let file = rest.strip_prefix(shot.name.as_str())?.strip_prefix('/')?;
                Some((shot, file))
            })
            .max_by_key(|(shot, _)| shot.name.len())
    }
}

/// File path inside a shot directory, or `None` when the request tries to leave it.
pub fn safe_relative_path(file: &str) -> Option<PathBuf> {
    if file.is_empty() || file.contains('\\') {
        return None;
    }
    let mut path = PathBuf::new();
    for segment in file.split('/') {
        match segment {
            "" | "." | ".." => return None,
            s => path.push(s),
        }
    }
    Some(path)
}
