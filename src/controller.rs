//! Stabilization: step physics until the grid is quiet, check for loss, score, clear,
//! and go again until nothing scores.
//!
//! Driven one host tick at a time through [`Stabilizer::advance`]. The work itself is
//! delegated to a [`Stabilize`] host so the state machine can be exercised without a grid.

/// Where the stabilization run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Stepping,
    CheckingLoss,
    Scoring,
    ClearingEffect,
}

/// Work the controller asks its host to do.
pub trait Stabilize {
    /// An in-flight clear effect.
    type Clear;

    /// One physics iteration. True if anything moved.
    fn step_physics(&mut self) -> bool;

    /// True if the run is lost. The controller stops for good when it is.
    fn check_loss(&mut self) -> bool;

    /// One scoring pass; `Some` if anything scored and a clear has started.
    fn score(&mut self) -> Option<Self::Clear>;

    /// Advance the clear by `dt` seconds. True once its cells are gone from the grid.
    fn advance_clear(&mut self, clear: &mut Self::Clear, dt: f32) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizerConfig {
    /// Consecutive no-movement iterations before the grid counts as quiet.
    pub quiet_iterations: u32,
    /// Extra iterations forced right after a clear, stopping early on a quiet one.
    pub settle_iterations: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            quiet_iterations: 2,
            settle_iterations: 5,
        }
    }
}

/// At most one run is active; [`Stabilizer::trigger`] on an active run does nothing.
#[derive(Debug, Clone)]
pub struct Stabilizer<C> {
    config: StabilizerConfig,
    phase: Phase,
    quiet: u32,
    clear: Option<C>,
}

impl<C> Stabilizer<C> {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            quiet: 0,
            clear: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_clearing(&self) -> bool {
        self.phase == Phase::ClearingEffect
    }

    pub fn clear_effect(&self) -> Option<&C> {
        self.clear.as_ref()
    }

    /// Start a run if idle. Returns true if a run was started.
    pub fn trigger(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        log::debug!("stabilizer: idle -> stepping");
        self.phase = Phase::Stepping;
        self.quiet = 0;
        true
    }

    /// Hand the controller a clear that was started outside a run. Physics is suspended
    /// until it finishes. Gives the clear back if one is already in flight.
    pub fn begin_clear(&mut self, clear: C) -> Result<(), C> {
        if self.clear.is_some() {
            return Err(clear);
        }
        log::debug!("stabilizer: {:?} -> clearing", self.phase);
        self.clear = Some(clear);
        self.phase = Phase::ClearingEffect;
        Ok(())
    }

    /// Drop any run and clear in flight, synchronously.
    pub fn cancel(&mut self) {
        if self.phase != Phase::Idle {
            log::debug!("stabilizer: cancelled in {:?}", self.phase);
        }
        self.phase = Phase::Idle;
        self.quiet = 0;
        self.clear = None;
    }

    /// One host tick. Transient phases (loss check, scoring) resolve within the tick;
    /// the call returns after one physics iteration, one clear update, or on going idle.
    pub fn advance<H>(&mut self, host: &mut H, dt: f32) -> Phase
    where
        H: Stabilize<Clear = C>,
    {
        loop {
            match self.phase {
                Phase::Idle => return Phase::Idle,
                Phase::Stepping => {
                    if host.step_physics() {
                        self.quiet = 0;
                        return Phase::Stepping;
                    }
                    self.quiet += 1;
                    if self.quiet < self.config.quiet_iterations {
                        return Phase::Stepping;
                    }
                    self.phase = Phase::CheckingLoss;
                }
                Phase::CheckingLoss => {
                    if host.check_loss() {
                        log::debug!("stabilizer: loss, going idle");
                        self.cancel();
                        return Phase::Idle;
                    }
                    self.phase = Phase::Scoring;
                }
                Phase::Scoring => match host.score() {
                    Some(clear) => {
                        self.clear = Some(clear);
                        self.phase = Phase::ClearingEffect;
                        return Phase::ClearingEffect;
                    }
                    None => {
                        self.phase = Phase::Idle;
                        self.quiet = 0;
                        return Phase::Idle;
                    }
                },
                Phase::ClearingEffect => {
                    let Some(clear) = self.clear.as_mut() else {
                        self.phase = Phase::Stepping;
                        continue;
                    };
                    if !host.advance_clear(clear, dt) {
                        return Phase::ClearingEffect;
                    }
                    self.clear = None;
                    for _ in 0..self.config.settle_iterations {
                        if !host.step_physics() {
                            break;
                        }
                    }
                    self.quiet = 0;
                    self.phase = Phase::Stepping;
                    return Phase::Stepping;
                }
            }
        }
    }
}

impl<C> Default for Stabilizer<C> {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}
