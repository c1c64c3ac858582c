//! Timed clear of a scored region: brighten, hold, fade out, then empty the cells.

use crate::color::{Rgba, ease_in_quad, ease_out_quad};
use crate::grid::Grid;

/// Durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearTiming {
    /// Brighten for half of this, then hold for the other half.
    pub highlight_secs: f32,
    /// Highlight colour = original × intensity.
    pub highlight_intensity: f32,
    pub fade_secs: f32,
}

impl Default for ClearTiming {
    fn default() -> Self {
        Self {
            highlight_secs: 0.5,
            highlight_intensity: 2.0,
            fade_secs: 0.3,
        }
    }
}

impl ClearTiming {
    pub fn total_secs(&self) -> f32 {
        self.highlight_secs + self.fade_secs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPhase {
    Highlight,
    Hold,
    FadeOut,
    Done,
}

/// A clear in flight. Only recolours cells until the fade ends; then empties them.
#[derive(Debug, Clone)]
pub struct ClearEffect {
    cells: Vec<(usize, usize)>,
    originals: Vec<Rgba>,
    /// Colours captured when the fade starts.
    fade_from: Vec<Rgba>,
    timing: ClearTiming,
    phase: ClearPhase,
    /// Seconds into the current phase.
    elapsed: f32,
    score: u32,
}

impl ClearEffect {
    pub fn new<I>(grid: &Grid, cells: I, score: u32, timing: ClearTiming) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut cells: Vec<_> = cells
            .into_iter()
            .filter(|&(x, y)| x < grid.width() && y < grid.height())
            .collect();
        cells.sort_unstable_by_key(|&(x, y)| (y, x));
        cells.dedup();
        let originals = cells.iter().map(|&(x, y)| grid.cell(x, y).color()).collect();
        Self {
            cells,
            originals,
            fade_from: Vec::new(),
            timing,
            phase: ClearPhase::Highlight,
            elapsed: 0.0,
            score,
        }
    }

    pub fn cells(&self) -> &[(usize, usize)] {
        &self.cells
    }

    pub fn phase(&self) -> ClearPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_done(&self) -> bool {
        self.phase == ClearPhase::Done
    }

    fn phase_duration(&self) -> f32 {
        match self.phase {
            ClearPhase::Highlight | ClearPhase::Hold => self.timing.highlight_secs * 0.5,
            ClearPhase::FadeOut => self.timing.fade_secs,
            ClearPhase::Done => 0.0,
        }
    }

    /// Advance by `dt` seconds, possibly through several phases. Returns true once the
    /// cells have been emptied.
    pub fn advance(&mut self, grid: &mut Grid, dt: f32) -> bool {
        let mut remaining = dt.max(0.0);
        loop {
            if self.phase == ClearPhase::Done {
                return true;
            }
            let duration = self.phase_duration();
            let left = (duration - self.elapsed).max(0.0);
            let finishes = remaining >= left;
            self.elapsed = if finishes { duration } else { self.elapsed + remaining };
            let t = if duration > 0.0 { self.elapsed / duration } else { 1.0 };
            self.paint(grid, t);
            if !finishes {
                return false;
            }
            remaining -= left;
            self.enter_next_phase(grid);
        }
    }

    fn paint(&self, grid: &mut Grid, t: f32) {
        match self.phase {
            ClearPhase::Highlight => {
                let k = ease_out_quad(t);
                let intensity = self.timing.highlight_intensity;
                for (&(x, y), original) in self.cells.iter().zip(&self.originals) {
                    grid.recolor(x, y, original.lerp(&original.brightened(intensity), k));
                }
            }
            ClearPhase::FadeOut => {
                let k = ease_in_quad(t);
                for (&(x, y), from) in self.cells.iter().zip(&self.fade_from) {
                    grid.recolor(x, y, from.with_alpha(from.a * (1.0 - k)));
                }
            }
            ClearPhase::Hold | ClearPhase::Done => {}
        }
    }

    fn enter_next_phase(&mut self, grid: &mut Grid) {
        self.elapsed = 0.0;
        self.phase = match self.phase {
            ClearPhase::Highlight => ClearPhase::Hold,
            ClearPhase::Hold => {
                self.fade_from = self.cells.iter().map(|&(x, y)| grid.cell(x, y).color()).collect();
                ClearPhase::FadeOut
            }
            ClearPhase::FadeOut | ClearPhase::Done => {
                for &(x, y) in &self.cells {
                    // Bounds were filtered in `new`.
                    let _ = grid.clear(x, y);
                }
                ClearPhase::Done
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SandColor;

    fn row_grid() -> Grid {
        let mut grid = Grid::new(3, 2);
        for x in 0..3 {
            grid.set(x, 1, SandColor::Blue.rgba()).unwrap();
        }
        grid
    }

    fn effect(grid: &Grid) -> ClearEffect {
        ClearEffect::new(grid, [(2, 1), (0, 1), (1, 1), (0, 1)], 30, ClearTiming::default())
    }

    #[test]
    fn test_cells_sorted_and_deduplicated() {
        let grid = row_grid();
        assert_eq!(effect(&grid).cells(), &[(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_phases_in_order() {
        let mut grid = row_grid();
        let mut fx = effect(&grid);
        assert_eq!(fx.phase(), ClearPhase::Highlight);
        assert!(!fx.advance(&mut grid, 0.1));
        assert_eq!(fx.phase(), ClearPhase::Highlight);
        assert!(!fx.advance(&mut grid, 0.2));
        assert_eq!(fx.phase(), ClearPhase::Hold);
        assert!(!fx.advance(&mut grid, 0.25));
        assert_eq!(fx.phase(), ClearPhase::FadeOut);
        assert_eq!(grid.occupied_count(), 3);
        assert!(fx.advance(&mut grid, 0.3));
        assert!(fx.is_done());
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_highlight_brightens_without_clearing() {
        let mut grid = row_grid();
        let mut fx = effect(&grid);
        fx.advance(&mut grid, 0.25);
        let c = grid.get(0, 1).unwrap().color();
        assert_eq!(c, SandColor::Blue.rgba().brightened(2.0));
        assert!(grid.get(0, 1).unwrap().is_occupied());
    }

    #[test]
    fn test_fade_lowers_alpha() {
        let mut grid = row_grid();
        let mut fx = effect(&grid);
        fx.advance(&mut grid, 0.5 + 0.15);
        let a = grid.get(1, 1).unwrap().color().a;
        assert!(a > 0.0 && a < 1.0, "alpha {a}");
    }

    #[test]
    fn test_one_large_step_finishes() {
        let mut grid = row_grid();
        let mut fx = effect(&grid);
        assert!(fx.advance(&mut grid, 10.0));
        assert_eq!(grid.occupied_count(), 0);
        assert!(fx.advance(&mut grid, 0.1));
    }

    #[test]
    fn test_zero_durations_clear_immediately() {
        let mut grid = row_grid();
        let timing = ClearTiming {
            highlight_secs: 0.0,
            highlight_intensity: 2.0,
            fade_secs: 0.0,
        };
        let mut fx = ClearEffect::new(&grid, [(0, 1)], 10, timing);
        assert!(fx.advance(&mut grid, 0.0));
        assert_eq!(grid.occupied_count(), 2);
    }
}
