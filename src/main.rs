//! Synheart Emotion CLI
//!
//! Streams recorded heart-rate samples through the on-device emotion engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synheart_emotion::{
    collector::{CollectorConfig, ReplayCollector},
    config::Config,
    core::{EmotionEngine, HsiBuilder, LinearClassifier, ModelParams},
    transparency::{create_shared_log, FanoutSink, TracingSink},
    PRIVACY_DECLARATION, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-emotion")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "On-device emotion inference from heart-rate streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream newline-delimited JSON samples through the engine
    Run {
        /// Sample file to replay (reads stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Model bundle to use instead of the configured one
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Print HSI 1.0 snapshots instead of raw results
        #[arg(long)]
        hsi: bool,
    },

    /// Show and validate a model bundle
    Model {
        /// Model bundle to inspect (built-in default when omitted)
        #[arg(long, short)]
        model: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Display privacy declaration
    Privacy,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, model, hsi } => cmd_run(input, model, hsi),
        Commands::Model { model } => cmd_model(model),
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
    }
}

fn cmd_run(input: Option<PathBuf>, model: Option<PathBuf>, hsi: bool) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    config.engine.validate()?;

    let params = load_model(model.as_deref().or(config.model_path.as_deref()))?;

    let transparency_log = create_shared_log();
    let sink = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(transparency_log.clone());

    let engine = EmotionEngine::new(config.engine.clone(), Arc::new(params))?
        .with_sink(Arc::new(sink));
    let hsi_builder = HsiBuilder::new().with_window_duration(config.engine.window_duration);

    eprintln!("Synheart Emotion v{VERSION}");
    eprintln!(
        "  Model: {} v{}",
        engine.model_info().id,
        engine.model_info().version
    );
    eprintln!(
        "  Window: {}ms, emission period: {}ms, min RR: {}",
        config.engine.window_duration.as_millis(),
        config.engine.emission_period.as_millis(),
        config.engine.min_rr_count
    );

    let reader: Box<dyn BufRead + Send> = match input {
        Some(ref path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut collector = ReplayCollector::new(CollectorConfig::default());
    collector.start(reader)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let receiver = collector.receiver().clone();

    while running.load(Ordering::SeqCst) {
        let sample = match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => sample,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        // Recorded streams carry their own clock.
        let now = sample.timestamp;
        engine.push_at(sample, now);

        match engine.try_emit_at(now) {
            Ok(Some(result)) => {
                let line = if hsi {
                    serde_json::to_string(&hsi_builder.build(&result, &engine.stats()))?
                } else {
                    serde_json::to_string(&result)?
                };
                println!("{line}");
            }
            Ok(None) => {}
            Err(e) => eprintln!("Warning: Inference failed: {e}"),
        }
    }

    collector.stop();

    if collector.skipped_lines() > 0 {
        eprintln!("Skipped {} malformed line(s)", collector.skipped_lines());
    }
    eprintln!();
    eprintln!("{}", transparency_log.summary());

    Ok(())
}

fn cmd_model(model: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    let params = load_model(model.as_deref().or(config.model_path.as_deref()))?;

    let info = params.info().clone();
    let labels = params.labels().join(", ");
    let features = params.feature_names().join(", ");
    let classifier = LinearClassifier::new(Arc::new(params));

    println!("Model");
    println!("=====");
    println!();
    println!("  Id: {}", info.id);
    println!("  Version: {}", info.version);
    println!("  Kind: {}", info.kind);
    if !info.description.is_empty() {
        println!("  Description: {}", info.description);
    }
    println!("  Labels: {labels}");
    println!("  Features: {features}");
    println!(
        "  Numerically valid: {}",
        if classifier.validate() { "yes ✓" } else { "no ✗" }
    );

    match EmotionEngine::new(Config::default().engine, Arc::new(classifier.params().clone())) {
        Ok(_) => println!("  Engine compatible: yes ✓"),
        Err(e) => println!("  Engine compatible: no ✗ ({e})"),
    }

    Ok(())
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Load a model bundle from `path`, or the built-in default.
fn load_model(path: Option<&Path>) -> anyhow::Result<ModelParams> {
    match path {
        Some(path) => ModelParams::from_path(path)
            .with_context(|| format!("Failed to load model from {}", path.display())),
        None => Ok(ModelParams::default_model()),
    }
}
