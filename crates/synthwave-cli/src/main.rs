use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use parking_lot::Mutex;
use serde::Serialize;
use synthwave_sequencer::pattern::DEFAULT_RANDOM_DENSITY;
use synthwave_sequencer::random::{entropy_source, seeded_source, RandomSource};
use synthwave_sequencer::{
    config, Dispatcher, EventId, GrooveTemplate, InstrumentKind, InstrumentRack, InstrumentSink,
    ManualTransport, NoteEvent, Pattern, PatternRecord, PatternStore, Sequencer, SequencerConfig,
    SinkError,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate(args) => execute_simulate(args),
        Commands::DemoPattern(args) => execute_demo(args),
        Commands::Validate(args) => execute_validate(args),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Offline tools for the Synthwave step sequencer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a pattern against a simulated transport and print every note.
    Simulate(SimulateArgs),
    /// Write a randomized demo pattern record.
    DemoPattern(DemoArgs),
    /// Check that a pattern record is well formed.
    Validate(ValidateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Pattern record (JSON). An empty default grid is used when omitted.
    #[arg(long)]
    pattern: Option<PathBuf>,
    /// Sequencer config; defaults to the one in the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of bars to play.
    #[arg(long, default_value_t = 2)]
    bars: u32,
    /// Override the configured tempo.
    #[arg(long)]
    bpm: Option<f32>,
    /// Override the configured groove template.
    #[arg(long, value_enum)]
    groove: Option<GrooveArg>,
    /// Override the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args)]
struct DemoArgs {
    /// Destination file; printed to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 16)]
    steps: u32,
    /// Chance that each cell becomes active.
    #[arg(long, default_value_t = DEFAULT_RANDOM_DENSITY)]
    density: f32,
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args)]
struct ValidateArgs {
    pattern: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GrooveArg {
    Straight,
    LightSwing,
    HeavySwing,
    Shuffle,
    Triplet,
}

impl From<GrooveArg> for GrooveTemplate {
    fn from(arg: GrooveArg) -> Self {
        match arg {
            GrooveArg::Straight => GrooveTemplate::Straight,
            GrooveArg::LightSwing => GrooveTemplate::LightSwing,
            GrooveArg::HeavySwing => GrooveTemplate::HeavySwing,
            GrooveArg::Shuffle => GrooveTemplate::Shuffle,
            GrooveArg::Triplet => GrooveTemplate::Triplet,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct PrintedNote {
    id: EventId,
    instrument: InstrumentKind,
    note: String,
    time: f64,
    duration: f64,
    velocity: f32,
}

/// Collects notes for every instrument so they can be printed in time order.
struct CollectingSink {
    kind: InstrumentKind,
    notes: Arc<Mutex<Vec<PrintedNote>>>,
}

impl InstrumentSink for CollectingSink {
    fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError> {
        self.notes.lock().push(PrintedNote {
            id: event.id,
            instrument: self.kind,
            note: event.note.to_string(),
            time: event.time,
            duration: event.duration,
            velocity: event.velocity,
        });
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<PatternRecord> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read pattern file {}", path.display()))?;
    PatternRecord::from_json(&text)
        .with_context(|| format!("{} is not a valid pattern record", path.display()))
}

fn execute_simulate(args: SimulateArgs) -> Result<()> {
    let mut cfg: SequencerConfig = match &args.config {
        Some(path) => config::load(path)?,
        None => config::load_default(),
    };
    if let Some(bpm) = args.bpm {
        cfg.bpm = bpm;
    }
    if let Some(groove) = args.groove {
        cfg.groove.apply_template(groove.into());
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }

    let mut pattern = Pattern::new(cfg.default_steps)?;
    if let Some(path) = &args.pattern {
        pattern.load_record(&read_record(path)?)?;
    }
    let subdivision = pattern.resolution();
    let store = Arc::new(PatternStore::new(pattern).with_groove(cfg.groove));

    let notes = Arc::new(Mutex::new(Vec::new()));
    let rack = InstrumentKind::ALL.into_iter().fold(InstrumentRack::new(), |rack, kind| {
        rack.with_sink(
            kind,
            Arc::new(CollectingSink {
                kind,
                notes: notes.clone(),
            }),
        )
    });
    let mut sequencer = Sequencer::new(store, Dispatcher::without_routing(rack))
        .with_options(cfg.session_options());
    let mut transport = ManualTransport::new(cfg.bpm, cfg.lookahead());

    let rng: Box<dyn RandomSource + Send> = match cfg.seed {
        Some(seed) => Box::new(seeded_source(seed)),
        None => Box::new(entropy_source()),
    };
    let ticks = args.bars * cfg.time_signature.sixteenths_per_bar() / subdivision.sixteenths();
    sequencer.start(&mut transport, rng)?;
    transport.advance(ticks as usize);
    sequencer.stop(&mut transport)?;

    let mut notes = std::mem::take(&mut *notes.lock());
    notes.sort_by(|a, b| a.time.total_cmp(&b.time));
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
        OutputFormat::Text => {
            println!(
                "Simulated {} bars at {} BPM ({} ticks of {})",
                args.bars, cfg.bpm, ticks, subdivision
            );
            for note in &notes {
                println!(
                    "  {:>9.4}s  {:<9} {:<4} vel {:.2}  len {:.4}s",
                    note.time,
                    note.instrument.as_str(),
                    note.note,
                    note.velocity,
                    note.duration
                );
            }
            println!("{} notes", notes.len());
        }
    }
    Ok(())
}

fn execute_demo(args: DemoArgs) -> Result<()> {
    let mut pattern = Pattern::new(args.steps)?;
    pattern.randomize(args.density, &mut seeded_source(args.seed));
    let json = pattern.to_record(format!("demo-{}", args.seed)).to_json()?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write pattern {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn execute_validate(args: ValidateArgs) -> Result<()> {
    let record = read_record(&args.pattern)?;
    let active = record.grid.iter().flatten().filter(|v| **v > 0.0).count();
    println!(
        "{}: {} rows x {} steps at {}, {} active cells",
        args.pattern.display(),
        record.grid.len(),
        record.steps,
        record.resolution,
        active
    );
    Ok(())
}
