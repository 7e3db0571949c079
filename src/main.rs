//! `curlflow [CONFIG.json] [--snapshot OUT.png [--frames N]]`
//!
//! Without `--snapshot` a window opens and runs until closed. With it, the
//! given number of frames is simulated and rendered on the CPU and the last
//! one written as a PNG.

use std::path::PathBuf;
use std::process::ExitCode;

use curlflow::{Simulation, SimulationConfig};

const SNAPSHOT_SIZE: (u32, u32) = (1280, 720);
const DEFAULT_SNAPSHOT_FRAMES: u32 = 300;

struct Args {
    config: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    frames: u32,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        snapshot: None,
        frames: DEFAULT_SNAPSHOT_FRAMES,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--snapshot" => {
                let path = iter.next().ok_or("--snapshot needs an output path")?;
                args.snapshot = Some(path.into());
            }
            "--frames" => {
                let n = iter.next().ok_or("--frames needs a count")?;
                args.frames = n.parse().map_err(|_| format!("invalid frame count `{}`", n))?;
            }
            _ if args.config.is_none() && !arg.starts_with("--") => args.config = Some(arg.into()),
            _ => return Err(format!("unexpected argument `{}`", arg)),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            SimulationConfig::from_file(path)?
        }
        None => SimulationConfig::default(),
    };

    let mut simulation = Simulation::new(config)?;

    match args.snapshot {
        Some(path) => {
            let (width, height) = SNAPSHOT_SIZE;
            let frame = simulation.render_headless(args.frames, width, height);
            frame.save_png(&path)?;
            log::info!("Wrote {} after {} frames", path.display(), args.frames);
            Ok(())
        }
        None => Ok(simulation.run()?),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("usage: curlflow [CONFIG.json] [--snapshot OUT.png [--frames N]]");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
