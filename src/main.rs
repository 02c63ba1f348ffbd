// Jupiter - Headless player
//
// Places the given WAV files on the timeline, plays the arrangement through the
// sound card and logs voice levels until every fragment has finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use jupiter::{
    AudioBackend, CpalBackend, MemoryBackend, SequencerConfig, Session, SessionError,
};

/// How often voice levels are logged while playing
const METER_INTERVAL: Duration = Duration::from_millis(500);

/// Grace period for voice threads after the last tick
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[clap(author, version, about = "Multi-track audio sequencer", long_about = None)]
struct Args {
    /// WAV files to place on the timeline, one track each
    files: Vec<PathBuf>,

    /// RON configuration file (defaults to the user config directory)
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Tempo of the beat grid
    #[clap(short, long, value_parser)]
    bpm: Option<u32>,

    /// Start time in seconds of each file, in the order given
    #[clap(short, long = "start", value_parser)]
    start: Vec<f64>,

    /// Position the playhead starts from, in seconds
    #[clap(long, default_value_t = 0.0)]
    from: f64,

    /// Output device name (see --list-devices)
    #[clap(long, value_parser)]
    device: Option<String>,

    /// Print the available output devices and exit
    #[clap(long, value_parser)]
    list_devices: bool,

    /// Render into memory instead of the sound card
    #[clap(long, value_parser)]
    dry_run: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SessionError> {
    if args.list_devices {
        for device in CpalBackend::list_output_devices() {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}: {}{}", device.id, device.name, marker);
        }
        return Ok(());
    }

    let mut config = SequencerConfig::resolve(args.config.as_deref())?;
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    let tick_interval = Duration::from_millis(config.tick_interval_ms);

    let device = if args.dry_run {
        None
    } else {
        Some(CpalBackend::init(args.device.clone())?)
    };
    let backend: Arc<dyn AudioBackend> = match &device {
        Some(device) => Arc::clone(device) as Arc<dyn AudioBackend>,
        None => Arc::new(MemoryBackend::realtime()),
    };

    let mut session = Session::new(config, backend)?;
    let report = session.open_files(&args.files);
    for (id, start) in report.loaded.iter().zip(&args.start) {
        session.move_fragment(*id, *start)?;
    }
    if report.loaded.is_empty() {
        log::warn!("Nothing to play");
        return Ok(());
    }

    let end = session
        .fragments()
        .iter()
        .map(|f| f.end_time())
        .fold(0.0, f64::max);
    let from_x = session.geometry().time_to_x(args.from);
    session.set_cursor_x(from_x);
    session.toggle_play();

    let mut last_meter = Instant::now();
    loop {
        let tick = session.tick();
        let elapsed = tick.elapsed.unwrap_or_default();

        if last_meter.elapsed() >= METER_INTERVAL {
            last_meter = Instant::now();
            log::info!("{}", session.play_position_label());
            for fragment in session.fragments().iter().filter(|f| f.is_playing()) {
                log::info!(
                    "  {:<16} {:>7.1} dB",
                    fragment.label(),
                    fragment.voice().current_decibel()
                );
            }
        }

        if elapsed >= end && session.all_voices_idle() {
            break;
        }
        std::thread::sleep(tick_interval);
    }

    session.shutdown();
    if !session.wait_for_voices(SHUTDOWN_TIMEOUT) {
        log::warn!("Some voices did not stop in time");
    }
    if let Some(device) = device {
        device.shutdown();
    }
    Ok(())
}
