// ksm-sim: headless play simulator.
//
// Replays recorded (or autoplay) input against a chart schedule frame by
// frame and prints the resulting score.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ksm_model::ChartSchedule;
use ksm_play::{PlayConfig, PlayResult, PlaySession, ReplayLog, ReplayPlayer};

/// Time simulated after the last note ends.
const TAIL_SEC: f64 = 2.0;

#[derive(Parser, Debug)]
#[command(name = "ksm-sim", about = "Simulate a play session headlessly")]
struct Args {
    /// Chart schedule JSON file.
    #[arg(long)]
    chart: PathBuf,

    /// Replay log JSON file.
    #[arg(long, conflicts_with = "autoplay")]
    replay: Option<PathBuf>,

    /// Play every note perfectly instead of reading a replay.
    #[arg(long)]
    autoplay: bool,

    /// Play config JSON file.
    #[arg(long, env = "KSM_PLAY_CONFIG", default_value = "play_config.json")]
    config: PathBuf,

    /// Simulation frame rate.
    #[arg(long, default_value_t = 240.0)]
    fps: f64,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Write the input used (e.g. the autoplay log) to this file.
    #[arg(long)]
    save_replay: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be positive (got {})", args.fps);
    }

    let schedule = ChartSchedule::load(&args.chart)
        .with_context(|| format!("failed to load chart {}", args.chart.display()))?;
    let config = PlayConfig::load_from(&args.config)?;

    let replay = match (&args.replay, args.autoplay) {
        (Some(path), _) => ReplayLog::load_from(path)?,
        (None, true) => ReplayLog::autoplay(&schedule, config.offset_sec()),
        (None, false) => bail!("either --replay or --autoplay is required"),
    };
    if let Some(path) = &args.save_replay {
        replay.save_to(path)?;
        log::info!("Saved replay to {}", path.display());
    }

    let result = simulate(&schedule, &config, &replay, args.fps)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

/// Run a whole play at a fixed frame rate.
fn simulate(
    schedule: &ChartSchedule,
    config: &PlayConfig,
    replay: &ReplayLog,
    fps: f64,
) -> Result<PlayResult> {
    let mut session = PlaySession::new(schedule, config)?;
    let mut player = ReplayPlayer::new(replay);

    let chart_end_sec = schedule
        .last_note_end()
        .map_or(0.0, |pulse| session.timing_cache().pulse_to_sec(pulse));
    let end_sec = chart_end_sec.max(replay.duration_sec()) + config.offset_sec() + TAIL_SEC;
    log::debug!("Simulating {:.3}s at {} fps", end_sec, fps);

    let mut frame: u64 = 0;
    loop {
        let t = frame as f64 / fps;
        if t > end_sec {
            break;
        }
        let input = player.advance(t);
        let events = session.update(t, &input);
        for beam in events.key_beams.iter().flatten() {
            log::trace!("{:.4}s key beam {:?}", beam.time_sec, beam.kind);
        }
        frame += 1;
    }

    Ok(session.result())
}

fn print_result(result: &PlayResult) {
    println!("SCORE     {:>8}", result.display_score);
    println!("CRITICAL  {:>8}", result.critical);
    println!("NEAR      {:>8}", result.near);
    println!("ERROR     {:>8}", result.error);
    println!("MISS      {:>8}", result.unjudged);
    println!("RAW       {:>8} / {}", result.score, result.score_max);
}
