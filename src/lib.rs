//! Falling-sand colour bridges: drop blocks of coloured sand onto a grid, let it settle,
//! and clear any colour that spans the grid from the left edge to the right edge.

pub mod clear;
pub mod color;
pub mod controller;
pub mod engine;
pub mod grid;
pub mod placement;
pub mod scoring;
pub mod shape;
pub mod sim;

pub use color::{Rgba, SandColor};
pub use controller::Phase;
pub use grid::{Cell, Grid, GridError};
pub use shape::{BlockKind, BlockShape};
pub use sim::{GameEvent, GameListener, SandConfig, SandError, SandGame};
