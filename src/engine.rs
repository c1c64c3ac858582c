//! One automaton step: every grain falls at most one cell, straight down or diagonally.

use crate::grid::Grid;
use rand::Rng;

/// Gravity step over a [`Grid`]. Randomness is supplied by the caller so runs replay
/// exactly from a seed.
#[derive(Debug, Clone, Default)]
pub struct SimulationEngine {
    steps: u64,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Advance one step. Returns true if any grain moved.
    ///
    /// Rows run bottom-up from `height - 2` so a grain moved into a lower row is never
    /// visited twice; even rows scan left→right and odd rows right→left so neither side
    /// is favoured.
    pub fn step<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R) -> bool {
        self.steps = self.steps.wrapping_add(1);
        let (w, h) = (grid.width(), grid.height());
        if h < 2 || w == 0 {
            return false;
        }
        let mut moved = false;
        for y in (0..h - 1).rev() {
            if y % 2 == 0 {
                for x in 0..w {
                    moved |= update_grain(grid, x, y, rng);
                }
            } else {
                for x in (0..w).rev() {
                    moved |= update_grain(grid, x, y, rng);
                }
            }
        }
        moved
    }

    /// Step until a step reports no movement, at most `max_steps` times.
    /// Returns the number of steps that moved something.
    pub fn settle<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R, max_steps: usize) -> usize {
        let mut moving = 0;
        while moving < max_steps && self.step(grid, rng) {
            moving += 1;
        }
        moving
    }
}

/// Caller guarantees `y + 1 < height`.
fn update_grain<R: Rng + ?Sized>(grid: &mut Grid, x: usize, y: usize, rng: &mut R) -> bool {
    if !grid.is_occupied_at(x, y) {
        return false;
    }
    let below = y + 1;
    // 1. Straight down
    if !grid.is_occupied_at(x, below) {
        grid.shift(x, y, x, below);
        return true;
    }
    // 2. Diagonal slip
    let can_left = x > 0 && !grid.is_occupied_at(x - 1, below);
    let can_right = x + 1 < grid.width() && !grid.is_occupied_at(x + 1, below);
    let target = match (can_left, can_right) {
        (true, true) => {
            if rng.random_bool(0.5) {
                x - 1
            } else {
                x + 1
            }
        }
        (true, false) => x - 1,
        (false, true) => x + 1,
        (false, false) => return false,
    };
    grid.shift(x, y, target, below);
    true
}
