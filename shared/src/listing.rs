use serde::{Deserialize, Serialize};

/// Payload of `/shots.json`: every discovered mapshot, grouped by save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShotsJson {
    #[serde(default)]
    pub all: Vec<ShotsJsonSave>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotsJsonSave {
    pub savename: String,
    /// Most played first.
    #[serde(default)]
    pub versions: Vec<ShotsJsonInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotsJsonInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// HTTP path of the shot directory, ending with `/`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub ticks_played: u64,
    /// Surface names in display order, comma separated.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub surface: String,
}

/// Answer of `/latest/<savename>`: where the newest render of a save lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LinkTarget {
    /// Load path to use, preferring the encoded form.
    pub fn load_path(&self) -> Option<&str> {
        self.encoded_path
            .as_deref()
            .or(self.path.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Game ticks per second of play time.
pub const TICKS_PER_SECOND: u64 = 60;
