//! Persist the grid and scores between runs (XDG config or ~/.config/sandbridge).

use anyhow::{Context, Result};
use sandbridge::{Grid, Rgba};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FILENAME: &str = "session.json";

/// What survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub cells: Vec<(usize, usize, [f32; 4])>,
    /// Height of the grid the cells were captured from; 0 when unknown.
    #[serde(default)]
    pub height: usize,
    pub score: u64,
    pub high_score: u64,
}

impl Session {
    pub fn capture(grid: &Grid, score: u64, high_score: u64) -> Self {
        Self {
            cells: grid
                .iter_occupied()
                .map(|(x, y, c)| (x, y, [c.r, c.g, c.b, c.a]))
                .collect(),
            height: grid.height(),
            score,
            high_score,
        }
    }

    /// Saved grains placed on a `width`×`height` grid. Rows keep their distance from the
    /// floor, so a shorter grid loses the top rows; grains that still do not fit are dropped.
    pub fn cells_within(&self, width: usize, height: usize) -> Vec<(usize, usize, Rgba)> {
        let shift = if self.height == 0 {
            0
        } else {
            height as i64 - self.height as i64
        };
        let cells: Vec<_> = self
            .cells
            .iter()
            .filter_map(|&(x, y, [r, g, b, a])| {
                let y = usize::try_from(y as i64 + shift).ok()?;
                (x < width && y < height).then(|| (x, y, Rgba::new(r, g, b, a)))
            })
            .collect();
        if cells.len() < self.cells.len() {
            log::warn!(
                "dropped {} saved grains outside {}x{}",
                self.cells.len() - cells.len(),
                width,
                height
            );
        }
        cells
    }
}

/// Returns the path to the session file (config dir / sandbridge / session.json).
pub fn config_path() -> PathBuf {
    let home_config = || {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_config(),
    };
    base.join("sandbridge").join(FILENAME)
}

/// Load a session. `None` if the file is missing or unreadable.
pub fn load_session(path: &Path) -> Option<Session> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            log::warn!("ignoring unreadable session {}: {e}", path.display());
            None
        }
    }
}

/// Save a session. Creates the config directory if needed.
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string(session)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    log::info!("saved {} grains to {}", session.cells.len(), path.display());
    Ok(())
}
