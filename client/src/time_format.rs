use mapshot_shared::TICKS_PER_SECOND;

/// `HH:MM:SS` play time of a save; hours keep counting past 24.
pub fn format_play_time(ticks_played: u64) -> String {
    let total = ticks_played / TICKS_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        total % 3600 / 60,
        total % 60
    )
}
