//! The sand game as seen by its host: place blocks, tick, reset, and hear about scores
//! and losses through an injected [`GameListener`].

use crate::clear::{ClearEffect, ClearTiming};
use crate::color::{DEFAULT_COLOR_TOLERANCE, Rgba};
use crate::controller::{Phase, Stabilize, Stabilizer, StabilizerConfig};
use crate::engine::SimulationEngine;
use crate::grid::{Grid, GridError};
use crate::placement::{Placement, PlacementResolver};
use crate::scoring::{BridgeRegion, ConnectivityScorer, DEFAULT_POINTS_PER_CELL};
use crate::shape::{BlockShape, DEFAULT_SUB_SQUARE_SIZE};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SandError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("a clear effect is already in progress")]
    ClearInProgress,
    #[error("the game is over; reset the grid first")]
    GameOver,
}

/// Tunables for a [`SandGame`].
#[derive(Debug, Clone, PartialEq)]
pub struct SandConfig {
    pub width: usize,
    pub height: usize,
    /// Engine steps per controller iteration (one iteration per host tick).
    pub steps_per_iteration: usize,
    pub quiet_iterations: u32,
    pub settle_iterations: u32,
    pub points_per_cell: u32,
    pub allow_diagonal: bool,
    pub color_tolerance: f32,
    /// Row whose occupancy after quiescence loses the game; `None` means `height / 5`.
    pub loss_row: Option<usize>,
    pub clear: ClearTiming,
    /// Block granularity used by hosts building shapes.
    pub sub_square_size: usize,
    pub seed: u64,
}

impl Default for SandConfig {
    fn default() -> Self {
        Self {
            width: 90,
            height: 110,
            steps_per_iteration: 5,
            quiet_iterations: 2,
            settle_iterations: 5,
            points_per_cell: DEFAULT_POINTS_PER_CELL,
            allow_diagonal: true,
            color_tolerance: DEFAULT_COLOR_TOLERANCE,
            loss_row: None,
            clear: ClearTiming::default(),
            sub_square_size: DEFAULT_SUB_SQUARE_SIZE,
            seed: 0x5eed,
        }
    }
}

impl SandConfig {
    pub fn loss_row(&self) -> usize {
        self.loss_row
            .unwrap_or(self.height / 5)
            .min(self.height.saturating_sub(1))
    }
}

/// Callbacks from the core to its host.
pub trait GameListener {
    /// Once per scoring colour per pass, when the clear starts.
    fn on_score(&mut self, _amount: u32, _color: Rgba, _cells: &HashSet<(usize, usize)>) {}

    /// Once, when the loss row is occupied after the grid settles.
    fn on_game_over(&mut self) {}
}

impl GameListener for () {}

/// Listener events, for hosts that poll instead of reacting.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Score {
        amount: u32,
        color: Rgba,
        cells: HashSet<(usize, usize)>,
    },
    GameOver,
}

impl GameListener for Vec<GameEvent> {
    fn on_score(&mut self, amount: u32, color: Rgba, cells: &HashSet<(usize, usize)>) {
        self.push(GameEvent::Score {
            amount,
            color,
            cells: cells.clone(),
        });
    }

    fn on_game_over(&mut self) {
        self.push(GameEvent::GameOver);
    }
}

/// Everything the stabilizer drives.
#[derive(Debug)]
struct World<L> {
    grid: Grid,
    rng: Pcg32,
    engine: SimulationEngine,
    scorer: ConnectivityScorer,
    listener: L,
    steps_per_iteration: usize,
    loss_row: usize,
    clear_timing: ClearTiming,
    game_over: bool,
    score: u64,
}

impl<L: GameListener> World<L> {
    fn score_pass(&mut self) -> Option<ClearEffect> {
        debug_assert!(!self.game_over, "scoring after game over");
        let pass = self.scorer.evaluate(&self.grid);
        if pass.is_empty() {
            return None;
        }
        for region in &pass.regions {
            self.listener.on_score(region.score, region.color, &region.cells);
        }
        self.score = self.score.saturating_add(u64::from(pass.total));
        log::info!(
            "scored {} points: {} colour(s), {} cells",
            pass.total,
            pass.regions.len(),
            pass.removal.len()
        );
        Some(ClearEffect::new(
            &self.grid,
            pass.removal,
            pass.total,
            self.clear_timing,
        ))
    }
}

impl<L: GameListener> Stabilize for World<L> {
    type Clear = ClearEffect;

    fn step_physics(&mut self) -> bool {
        let mut moved = false;
        for _ in 0..self.steps_per_iteration {
            moved |= self.engine.step(&mut self.grid, &mut self.rng);
        }
        moved
    }

    fn check_loss(&mut self) -> bool {
        if self.game_over || !self.grid.row_occupied(self.loss_row) {
            return self.game_over;
        }
        log::info!("loss row {} reached; game over", self.loss_row);
        self.game_over = true;
        self.listener.on_game_over();
        true
    }

    fn score(&mut self) -> Option<ClearEffect> {
        self.score_pass()
    }

    fn advance_clear(&mut self, clear: &mut ClearEffect, dt: f32) -> bool {
        let done = clear.advance(&mut self.grid, dt);
        if done {
            log::debug!("cleared {} cells", clear.cells().len());
        }
        done
    }
}

/// The falling-sand core: grid, physics, placement, scoring and the stabilization run.
#[derive(Debug)]
pub struct SandGame<L = ()> {
    config: SandConfig,
    stabilizer: Stabilizer<ClearEffect>,
    world: World<L>,
}

impl<L: GameListener> SandGame<L> {
    pub fn new(config: SandConfig, listener: L) -> Self {
        let scorer = ConnectivityScorer {
            points_per_cell: config.points_per_cell,
            allow_diagonal: config.allow_diagonal,
            tolerance: config.color_tolerance,
        };
        let stabilizer = Stabilizer::new(StabilizerConfig {
            quiet_iterations: config.quiet_iterations.max(1),
            settle_iterations: config.settle_iterations,
        });
        let world = World {
            grid: Grid::new(config.width, config.height),
            rng: Pcg32::seed_from_u64(config.seed),
            engine: SimulationEngine::new(),
            scorer,
            listener,
            steps_per_iteration: config.steps_per_iteration.max(1),
            loss_row: config.loss_row(),
            clear_timing: config.clear,
            game_over: false,
            score: 0,
        };
        Self {
            config,
            stabilizer,
            world,
        }
    }

    pub fn config(&self) -> &SandConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.world.grid
    }

    pub fn listener(&self) -> &L {
        &self.world.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.world.listener
    }

    pub fn score(&self) -> u64 {
        self.world.score
    }

    pub fn reset_score(&mut self) {
        self.world.score = 0;
    }

    pub fn is_game_over(&self) -> bool {
        self.world.game_over
    }

    pub fn loss_row(&self) -> usize {
        self.world.loss_row
    }

    pub fn phase(&self) -> Phase {
        self.stabilizer.phase()
    }

    pub fn is_clearing(&self) -> bool {
        self.stabilizer.is_clearing()
    }

    /// Cells of the clear in flight, if any.
    pub fn clearing_cells(&self) -> Option<&[(usize, usize)]> {
        self.stabilizer.clear_effect().map(ClearEffect::cells)
    }

    /// Drop `shape` centred on grid cell `anchor` and start stabilizing.
    /// An empty shape is a no-op (`Ok(None)`).
    pub fn place_block(
        &mut self,
        shape: &BlockShape,
        color: Rgba,
        anchor: (i32, i32),
    ) -> Result<Option<Placement>, SandError> {
        if self.world.game_over {
            log::warn!("placement ignored: game over");
            return Err(SandError::GameOver);
        }
        let Some(placement) = PlacementResolver::resolve(&self.world.grid, shape, anchor) else {
            log::debug!("placement of empty shape ignored");
            return Ok(None);
        };
        if placement.overlaps > 0 {
            log::warn!(
                "grid full to the top: block pinned at row 0 over {} grains",
                placement.overlaps
            );
        }
        let written = PlacementResolver::commit(&mut self.world.grid, &placement, color);
        log::debug!(
            "placed {} cells at origin ({}, {})",
            written,
            placement.origin_x,
            placement.origin_y
        );
        self.stabilizer.trigger();
        Ok(Some(placement))
    }

    /// One host tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> Phase {
        if self.world.game_over {
            return self.stabilizer.phase();
        }
        self.stabilizer.advance(&mut self.world, dt)
    }

    /// Run a scoring pass now and start its clear. Returns the points scored.
    pub fn check_and_clear_paths(&mut self) -> Result<u32, SandError> {
        if self.stabilizer.is_clearing() {
            log::warn!("scoring requested while a clear is in progress");
            return Err(SandError::ClearInProgress);
        }
        if self.world.game_over {
            return Err(SandError::GameOver);
        }
        let Some(effect) = self.world.score_pass() else {
            return Ok(0);
        };
        let total = effect.score();
        if self.stabilizer.begin_clear(effect).is_err() {
            return Err(SandError::ClearInProgress);
        }
        Ok(total)
    }

    /// Bridge regions present right now, without clearing anything.
    pub fn find_bridge_regions(&self) -> Vec<BridgeRegion> {
        self.world.scorer.find_bridge_regions(&self.world.grid)
    }

    /// Cancel any run and clear in flight, then empty the grid and lift game over.
    pub fn reset_grid(&mut self) {
        self.stabilizer.cancel();
        self.world.grid.reset();
        self.world.game_over = false;
        log::info!("grid reset");
    }

    /// Bulk restore of saved grains; nothing is written if any coordinate is out of range
    /// or the game is over.
    pub fn load_cells<I>(&mut self, cells: I) -> Result<usize, SandError>
    where
        I: IntoIterator<Item = (usize, usize, Rgba)>,
    {
        if self.world.game_over {
            return Err(SandError::GameOver);
        }
        let loaded = self.world.grid.load_cells(cells)?;
        if loaded > 0 {
            self.stabilizer.trigger();
        }
        Ok(loaded)
    }

    /// Restore a saved running score.
    pub fn set_score(&mut self, score: u64) {
        self.world.score = score;
    }
}
