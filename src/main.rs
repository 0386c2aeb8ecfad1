//! Crystal Resonance headless runner
//!
//! Drives the simulation with a simple aiming bot at a fixed frame rate and
//! reports the outcome. Useful for balance checks and reproducing seeds.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use clap::Parser;
    use crystal_resonance::sim::{CrystalColor, GameEvent, Side};
    use crystal_resonance::{FrameInput, GameState, Settings, SimResult, Tuning, tick};

    /// Crystal Resonance headless simulation
    #[derive(Parser, Debug)]
    #[command(version, about = "Runs the crystal simulation without a window")]
    pub struct Cli {
        /// Run seed
        #[arg(long, default_value_t = 1)]
        pub seed: u64,

        /// Simulated seconds
        #[arg(long, default_value_t = 60.0)]
        pub seconds: f32,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        pub fps: f32,

        /// Seconds between bot shots
        #[arg(long, default_value_t = 0.5)]
        pub shoot_interval: f32,

        /// Balance table (JSON)
        #[arg(long, value_name = "PATH")]
        pub tuning: Option<PathBuf>,

        /// Player settings (JSON)
        #[arg(long, value_name = "PATH")]
        pub settings: Option<PathBuf>,

        /// Print the final snapshot as JSON
        #[arg(long)]
        pub json: bool,

        /// Stop at game over instead of running the full duration
        #[arg(long)]
        pub stop_on_game_over: bool,
    }

    /// Lane the bot should fire into: a lane holding a crystal of the queued
    /// color, fullest first, or the fullest lane when nothing matches.
    pub fn choose_lane(state: &GameState) -> usize {
        let next = state.launcher().next_color();
        let field = state.field();
        let fill = |lane: usize| -> f32 {
            Side::BOTH
                .iter()
                .filter_map(|side| field.get(lane, *side).ok())
                .map(|c| c.height)
                .sum()
        };
        let has_color = |lane: usize, color: CrystalColor| {
            Side::BOTH
                .iter()
                .filter_map(|side| field.get(lane, *side).ok())
                .any(|c| c.color == color)
        };

        let by_fill = |a: &usize, b: &usize| fill(*a).total_cmp(&fill(*b));

        (0..field.lanes())
            .filter(|l| has_color(*l, next))
            .max_by(by_fill)
            .or_else(|| (0..field.lanes()).max_by(by_fill))
            .unwrap_or(0)
    }

    fn load_config(cli: &Cli) -> SimResult<GameState> {
        let tuning = match &cli.tuning {
            Some(path) => Tuning::load(path)?,
            None => Tuning::default(),
        };
        let settings = match &cli.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        GameState::with_config(cli.seed, tuning, settings)
    }

    pub fn run(cli: Cli) -> SimResult<()> {
        let mut state = load_config(&cli)?;
        let dt = 1.0 / cli.fps.max(1.0);
        let frames = (cli.seconds.max(0.0) * cli.fps.max(1.0)).round() as u64;
        let mut since_shot = 0.0;
        let (mut matches, mut misses) = (0u32, 0u32);

        log::info!("Simulating {frames} frames at {} fps", cli.fps);

        for _ in 0..frames {
            since_shot += dt;
            let lane = choose_lane(&state);
            let shoot = since_shot >= cli.shoot_interval;
            if shoot {
                since_shot = 0.0;
            }
            let input = FrameInput {
                target_lane: Some(lane),
                shoot,
                restart: false,
            };
            tick(&mut state, &input, dt);

            for event in state.drain_events() {
                log::debug!("{event:?}");
                match event {
                    GameEvent::Match { .. } => matches += 1,
                    GameEvent::Mismatch { .. } => misses += 1,
                    _ => {}
                }
            }
            if cli.stop_on_game_over && !state.is_active() {
                break;
            }
        }

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
        } else {
            println!(
                "seed {} | frames {} | score {} | level {} | matches {} | misses {} | {}",
                state.seed,
                state.frame(),
                state.score(),
                state.level(),
                matches,
                misses,
                if state.is_active() { "alive" } else { "game over" }
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Crystal Resonance (headless) starting...");

    let cli = native::Cli::parse();
    if let Err(e) = native::run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless runner on wasm32; browser hosts link the rlib and drive GameState
}
