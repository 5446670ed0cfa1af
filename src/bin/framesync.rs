//! framesync - run a synthetic triggered-camera session and print the event log

use clap::Parser;
use framesync::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML session config. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames the synthetic camera triggers.
    #[arg(long)]
    frames: Option<u32>,
    /// Seed for the loss simulation.
    #[arg(long)]
    seed: Option<u64>,
    /// Probability of losing an exposure end event.
    #[arg(long)]
    drop_exposure_end: Option<f64>,
    /// Probability of losing an image.
    #[arg(long)]
    drop_image: Option<f64>,
    /// Probability of an exposure end event arriving twice.
    #[arg(long)]
    duplicate: Option<f64>,
}

fn session_config(args: &Args) -> framesync::Result<SessionConfig> {
    let mut cfg = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default()
    };

    if let Some(v) = args.frames { cfg.frames = v; }
    if let Some(v) = args.seed { cfg.seed = v; }
    if let Some(v) = args.drop_exposure_end { cfg.loss.exposure_end_drop = v; }
    if let Some(v) = args.drop_image { cfg.loss.image_drop = v; }
    if let Some(v) = args.duplicate { cfg.loss.duplicate = v; }

    cfg.validate()?;

    Ok(cfg)
}

fn run(args: &Args) -> framesync::Result<()> {
    let cfg = session_config(args)?;
    let script = SyntheticCamera::new(cfg.frames, cfg.seed, cfg.loss)?
        .starting_at(cfg.monitor.initial_frame)
        .script();

    let session = CaptureSession::start(&cfg.monitor, |frame: FrameNumber| {
        log::info!("item or sensor head can be moved (frame {frame})");
    });
    let monitor = session.monitor();

    for delivery in script {
        if session.deliver(delivery).is_err() { break; }
    }

    let result = session.finish();

    println!();
    println!("{}", monitor.journal());

    let report = result?;

    for w in &report.warnings {
        eprintln!("warning: {w}");
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("An exception occurred: {e}");
            ExitCode::FAILURE
        }
    }
}
