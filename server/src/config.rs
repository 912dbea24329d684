use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = "script-output";
pub const DEFAULT_CLIENT_DIST: &str = "client/dist";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_RESCAN_SECS: u64 = 10;

/// File name marking a rendered mapshot directory.
pub const MAPSHOT_FILE_NAME: &str = "mapshot.json";

pub fn data_dir() -> PathBuf {
    non_empty_var("MAPSHOT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn client_dist() -> PathBuf {
    non_empty_var("MAPSHOT_CLIENT_DIST")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_DIST))
}

pub fn server_port() -> u16 {
    std::env::var("MAPSHOT_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn rescan_interval() -> Duration {
    std::env::var("MAPSHOT_RESCAN_SECS")
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_RESCAN_SECS))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
