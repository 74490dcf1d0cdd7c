//! hy-cli: run flappy and bouncing-ball simulations from the command line.

use clap::{Parser, Subcommand, ValueEnum};
use hy_automaton::{ConfigurationError, InputEvent, InputSchedule, Mode, Payload};
use hy_core::{CoreError, Interval};
use hy_games::{
    BallParams, ControlStyle, FlappyLevel, FlappyMode, FlappyParams, ball_automaton,
    flappy_automaton,
};
use hy_reach::{
    Band, HybridTime, InputBound, PayloadBound, ReachError, ReachOptions, ReachReport, SampleBox,
    SamplingStrategy, analyze,
};
use hy_sim::{
    Horizon, IntegratorKind, IntegratorOptions, SimError, SimOptions, Simulator, Trajectory,
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Reach(#[from] ReachError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hy-cli")]
#[command(about = "Hybrid game simulator - flappy and bouncing ball", long_about = None)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON instead of a text summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flappy avoider
    #[command(subcommand)]
    Flappy(FlappyCommands),
    /// Bouncing ball
    #[command(subcommand)]
    Ball(BallCommands),
}

#[derive(Subcommand)]
enum FlappyCommands {
    /// Simulate one run
    Single {
        #[command(flatten)]
        game: GameArgs,
        #[command(flatten)]
        sim: SimArgs,
        /// Initial height
        #[arg(long, default_value_t = 2.5)]
        y: f64,
        /// Initial vertical velocity
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        vy: f64,
        /// Flap times in seconds (repeatable)
        #[arg(long)]
        flap: Vec<f64>,
        /// Per-step button samples, e.g. 000110; overrides --flap
        #[arg(long)]
        buttons: Option<String>,
    },
    /// Sampled reachability over a box of initial heights and velocities
    Reach {
        #[command(flatten)]
        game: GameArgs,
        #[command(flatten)]
        sim: SimArgs,
        #[arg(long, default_value_t = 2.5)]
        y_min: f64,
        #[arg(long, default_value_t = 2.5)]
        y_max: f64,
        #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
        vy_min: f64,
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
        vy_max: f64,
        /// Flap time in seconds (fixed for every sample)
        #[arg(long)]
        flap: Option<f64>,
        /// Number of samples
        #[arg(short = 'n', long, default_value_t = 20)]
        samples: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = StrategyArg::Grid)]
        strategy: StrategyArg,
        /// Simulate samples on one thread
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Subcommand)]
enum BallCommands {
    /// Simulate one run
    Single {
        #[command(flatten)]
        sim: SimArgs,
        /// Drop height
        #[arg(long, default_value_t = 2.0)]
        y: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        vy: f64,
        #[arg(long, default_value_t = 9.81)]
        gravity: f64,
        /// Coefficient of restitution in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        restitution: f64,
    },
}

#[derive(clap::Args)]
struct GameArgs {
    #[arg(long, value_enum, default_value_t = StyleArg::Tap)]
    style: StyleArg,
    #[arg(long, value_enum, default_value_t = LevelArg::Scripted)]
    level: LevelArg,
    #[arg(long, default_value_t = 9.81)]
    gravity: f64,
    #[arg(long, default_value_t = 2.0)]
    forward_speed: f64,
    #[arg(long, default_value_t = 2.0)]
    flap_impulse: f64,
}

#[derive(clap::Args)]
struct SimArgs {
    /// Sample interval in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,
    /// End time in seconds
    #[arg(long, default_value_t = 1.0)]
    horizon: f64,
    #[arg(long, value_enum, default_value_t = IntegratorArg::Dopri)]
    integrator: IntegratorArg,
    #[arg(long, default_value_t = 1_000)]
    max_jumps: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Tap,
    Hold,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Open,
    Scripted,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Grid,
    Random,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Dopri,
    Rk4,
    Euler,
}

impl GameArgs {
    fn params(&self) -> FlappyParams {
        FlappyParams {
            gravity: self.gravity,
            forward_speed: self.forward_speed,
            flap_impulse: self.flap_impulse,
            style: match self.style {
                StyleArg::Tap => ControlStyle::Tap,
                StyleArg::Hold => ControlStyle::Hold,
            },
            ..FlappyParams::default()
        }
    }

    fn level(&self) -> FlappyLevel {
        match self.level {
            LevelArg::Open => FlappyLevel::open(),
            LevelArg::Scripted => FlappyLevel::scripted(),
        }
    }
}

impl SimArgs {
    fn options(&self, horizon: Horizon) -> SimOptions {
        SimOptions {
            sample_rate: self.dt,
            horizon,
            max_jumps: self.max_jumps,
            integrator: IntegratorOptions {
                kind: match self.integrator {
                    IntegratorArg::Dopri => IntegratorKind::DormandPrince,
                    IntegratorArg::Rk4 => IntegratorKind::Rk4,
                    IntegratorArg::Euler => IntegratorKind::ForwardEuler,
                },
                ..IntegratorOptions::default()
            },
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Flappy(FlappyCommands::Single {
            game,
            sim,
            y,
            vy,
            flap,
            buttons,
        }) => cmd_flappy_single(&game, &sim, y, vy, &flap, buttons.as_deref(), cli.json),
        Commands::Flappy(FlappyCommands::Reach {
            game,
            sim,
            y_min,
            y_max,
            vy_min,
            vy_max,
            flap,
            samples,
            seed,
            strategy,
            sequential,
        }) => {
            let sample_box = SampleBox::new(
                FlappyMode::Falling,
                vec![Interval::point(0.0), Interval::new(y_min, y_max, "y")?],
                vec![
                    Interval::point(game.forward_speed),
                    Interval::new(vy_min, vy_max, "vy")?,
                ],
            )?;
            let sample_box = match flap {
                Some(t) => sample_box.with_input(InputBound::at(t, PayloadBound::Press)?),
                None => sample_box,
            };
            let options = ReachOptions {
                num_samples: samples,
                seed,
                strategy: match strategy {
                    StrategyArg::Grid => SamplingStrategy::Grid,
                    StrategyArg::Random => SamplingStrategy::Pseudorandom,
                },
                parallel: !sequential,
            };
            cmd_flappy_reach(&game, &sim, &sample_box, &options, cli.json)
        }
        Commands::Ball(BallCommands::Single {
            sim,
            y,
            vy,
            gravity,
            restitution,
        }) => {
            let params = BallParams {
                gravity,
                restitution,
            };
            cmd_ball_single(&params, &sim, y, vy, cli.json)
        }
    }
}

fn cmd_flappy_single(
    game: &GameArgs,
    sim: &SimArgs,
    y: f64,
    vy: f64,
    flaps: &[f64],
    buttons: Option<&str>,
    json: bool,
) -> CliResult<()> {
    let params = game.params();
    let automaton = flappy_automaton(&params, &game.level())?;

    let (inputs, horizon) = match buttons {
        Some(levels) => {
            let samples: Vec<u8> = levels.bytes().map(|b| u8::from(b != b'0')).collect();
            (
                InputSchedule::from_button_samples(&samples, sim.dt)?,
                Horizon::InputLength,
            )
        }
        None => (
            InputSchedule::new(
                flaps
                    .iter()
                    .map(|&t| InputEvent::new(t, Payload::Press))
                    .collect(),
            )?,
            Horizon::Time(sim.horizon),
        ),
    };

    let simulator = Simulator::new(&automaton, sim.options(horizon))?;
    let initial = params.initial_state(0.0, y, vy)?;
    let trajectory = simulator.run(&initial, &inputs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trajectory)?);
    } else {
        print_trajectory(&trajectory, |m| automaton.mode_name(m));
    }
    Ok(())
}

fn cmd_flappy_reach(
    game: &GameArgs,
    sim: &SimArgs,
    sample_box: &SampleBox<FlappyMode>,
    options: &ReachOptions,
    json: bool,
) -> CliResult<()> {
    let params = game.params();
    let automaton = flappy_automaton(&params, &game.level())?;
    let simulator = Simulator::new(&automaton, sim.options(Horizon::Time(sim.horizon)))?;

    info!(samples = options.num_samples, "starting reachability");
    let report = analyze(&simulator, sample_box, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ReachJson::from(&report))?);
    } else {
        print_report(&report, sample_box.dims());
    }
    Ok(())
}

fn cmd_ball_single(params: &BallParams, sim: &SimArgs, y: f64, vy: f64, json: bool) -> CliResult<()> {
    let automaton = ball_automaton(params)?;
    let simulator = Simulator::new(&automaton, sim.options(Horizon::Time(sim.horizon)))?;
    let initial = params.initial_state(y, vy)?;
    let trajectory = simulator.run(&initial, &InputSchedule::empty())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trajectory)?);
    } else {
        print_trajectory(&trajectory, |m| automaton.mode_name(m));
    }
    Ok(())
}

fn print_trajectory<M: Mode>(trajectory: &Trajectory<M>, name: impl Fn(M) -> String) {
    let end = &trajectory.termination;
    println!(
        "Terminated: {} at t={:.4} s (step {})",
        end.reason, end.time, end.step
    );
    println!(
        "  {} samples, {} jumps, dt={} s",
        trajectory.len(),
        trajectory.jump_count(),
        trajectory.sample_rate
    );
    for sample in trajectory.jumps() {
        let x = &sample.state.continuous;
        println!(
            "  jump #{:<3} t={:.4} -> {:<10} pos={:?} vel={:?}",
            sample.jumps,
            sample.time(),
            name(sample.state.mode),
            x.position.as_slice(),
            x.velocity.as_slice()
        );
    }
    if let Some(last) = trajectory.last() {
        let x = &last.state.continuous;
        println!(
            "Final: {} pos={:?} vel={:?}",
            name(last.state.mode),
            x.position.as_slice(),
            x.velocity.as_slice()
        );
    }
}

/// Band over every jump index at the latest step reached.
fn final_band(report: &ReachReport) -> Option<&Band> {
    let envelope = &report.envelope;
    envelope.last_step().and_then(|step| envelope.band_at_step(step))
}

fn print_report(report: &ReachReport, dims: usize) {
    println!("{report}");
    let Some(last) = final_band(report) else {
        return;
    };
    println!("Final band at t={:.4} s ({} live):", last.time, last.live);
    for (i, b) in last.position(dims).iter().enumerate() {
        println!("  pos[{i}] in [{:.4}, {:.4}]", b.min, b.max);
    }
    for (i, b) in last.velocity(dims).iter().enumerate() {
        println!("  vel[{i}] in [{:.4}, {:.4}]", b.min, b.max);
    }
}

#[derive(Serialize)]
struct ReachJson<'a> {
    total: usize,
    skipped: usize,
    seed: u64,
    strategy: SamplingStrategy,
    outcomes: &'a std::collections::BTreeMap<&'static str, usize>,
    bands: Vec<(&'a HybridTime, &'a Band)>,
    steps: Vec<(&'a u64, &'a Band)>,
}

impl<'a> From<&'a ReachReport> for ReachJson<'a> {
    fn from(report: &'a ReachReport) -> Self {
        Self {
            total: report.total,
            skipped: report.skipped,
            seed: report.seed,
            strategy: report.strategy,
            outcomes: &report.outcomes,
            bands: report.envelope.bands().collect(),
            steps: report.envelope.steps().collect(),
        }
    }
}
