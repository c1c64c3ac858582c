//! Sandbridge: drop blocks of coloured sand and bridge the grid edge to edge in one colour.

mod app;
mod input;
mod save;
mod theme;
mod tray;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use sandbridge::SandConfig;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = match theme::Theme::load(args.theme.as_deref()) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using default: {e}");
            theme::Theme::default()
        }
    };
    let config = args.sand_config();
    log::info!("starting with {config:?}");
    let save_path = (!args.no_save).then(save::config_path);
    let mut app = App::new(config, theme, args.frame_rate, save_path);
    app.run()?;
    Ok(())
}

/// Logs go to a file or nowhere; the terminal belongs to the game.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Falling-sand colour bridges in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "sandbridge",
    version,
    about = "Falling-sand puzzle in the terminal. Drop blocks of coloured sand; connect one colour from the left edge to the right edge to clear it.",
    long_about = "Sandbridge is a terminal falling-sand puzzle.\n\n\
        Pick one of three blocks and drop it on the board. Blocks turn into sand, which \
        settles under gravity. A single colour touching both the left and right edges \
        clears, together with everything of that colour connected to it. Sand resting on \
        the red line after the board settles ends the game.\n\n\
        CONTROLS:\n  Arrows / hjkl   Move cursor (Shift = fast)\n  1 2 3 / Tab     Pick block\n  \
        Space / Enter   Drop\n  P               Pause\n  R               Retry\n  Q / Esc         Quit\n\n\
        The board shrinks to fit the terminal. Use --theme to load a btop-style theme."
)]
pub struct Args {
    /// Grid width in cells (shrunk to fit the terminal).
    #[arg(long, default_value = "90", value_name = "CELLS")]
    pub width: usize,

    /// Grid height in cells; two cells per terminal row (shrunk to fit the terminal).
    #[arg(long, default_value = "110", value_name = "CELLS")]
    pub height: usize,

    /// Each block square is N×N sand cells.
    #[arg(long, default_value = "7", value_name = "N")]
    pub cell_size: usize,

    /// Physics steps per frame.
    #[arg(long, default_value = "5", value_name = "N")]
    pub steps_per_frame: usize,

    /// Points per cleared grain.
    #[arg(long, default_value = "10", value_name = "N")]
    pub points_per_cell: u32,

    /// Only orthogonal neighbours connect a bridge.
    #[arg(long)]
    pub no_diagonal: bool,

    /// Per-channel colour tolerance for "same colour".
    #[arg(long, default_value = "0.1", value_name = "T")]
    pub tolerance: f32,

    /// Target frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// RNG seed for physics and blocks (default: from the clock).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Neither restore nor save the board.
    #[arg(long)]
    pub no_save: bool,

    /// Write logs to this file (RUST_LOG filters; default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    fn sand_config(&self) -> SandConfig {
        let seed = self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        SandConfig {
            width: self.width.max(1),
            height: self.height.max(2),
            steps_per_iteration: self.steps_per_frame.max(1),
            points_per_cell: self.points_per_cell,
            allow_diagonal: !self.no_diagonal,
            color_tolerance: self.tolerance.max(0.0),
            sub_square_size: self.cell_size.max(1),
            seed,
            ..SandConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_core_defaults() {
        let args = Args::parse_from(["sandbridge", "--seed", "9"]);
        let config = args.sand_config();
        assert_eq!(
            config,
            SandConfig {
                seed: 9,
                ..SandConfig::default()
            }
        );
        assert!(!args.no_save);
    }

    #[test]
    fn test_flags_reach_config() {
        let args = Args::parse_from([
            "sandbridge",
            "--width",
            "40",
            "--no-diagonal",
            "--tolerance",
            "0.2",
            "--cell-size",
            "3",
            "--seed",
            "1",
        ]);
        let config = args.sand_config();
        assert_eq!(config.width, 40);
        assert!(!config.allow_diagonal);
        assert_eq!(config.color_tolerance, 0.2);
        assert_eq!(config.sub_square_size, 3);
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
