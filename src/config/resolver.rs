//! Settings inheritance: per-board overrides layered over the `default` entry

use std::collections::HashMap;

use super::models::{BoardOverrides, BoardSettings};
use super::ConfigError;

/// Resolve one board's settings against the shared `default` entry.
///
/// The board's own entry may be entirely absent, in which case defaults
/// alone apply. `path` and `table` are derived from the board name before
/// default inheritance, so they always reflect board identity unless the
/// board overrides them explicitly. Resolution is pure and idempotent.
pub fn resolve_board(
    name: &str,
    boards: &HashMap<String, BoardOverrides>,
) -> Result<BoardSettings, ConfigError> {
    let defaults = boards.get("default").ok_or(ConfigError::MissingDefaults)?;
    let overrides = boards.get(name).cloned().unwrap_or_default();

    let path = match overrides.path {
        Some(path) => path,
        None => {
            let base = defaults.path.clone().ok_or(ConfigError::MissingField {
                board: name.to_string(),
                field: "path",
            })?;
            format!("{base}/{name}/")
        }
    };

    Ok(BoardSettings {
        board: name.to_string(),
        path,
        table: overrides.table.unwrap_or_else(|| name.to_string()),
        engine: overrides.engine.or_else(|| defaults.engine.clone()),
        database: overrides.database.or_else(|| defaults.database.clone()),
        thumb_threads: overrides
            .thumb_threads
            .or(defaults.thumb_threads)
            .unwrap_or(0),
        media_threads: overrides
            .media_threads
            .or(defaults.media_threads)
            .unwrap_or(0),
        deleted_threads_threshold_page: overrides
            .deleted_threads_threshold_page
            .or(defaults.deleted_threads_threshold_page)
            .unwrap_or(0),
        refresh_delay: overrides
            .refresh_delay
            .or(defaults.refresh_delay)
            .unwrap_or(DEFAULT_REFRESH_DELAY),
    })
}

const DEFAULT_REFRESH_DELAY: u64 = 30;
