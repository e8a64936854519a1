//! Demonstration of the Synheart Emotion inference pipeline.
//!
//! This example shows how to:
//! 1. Create an engine with the built-in model
//! 2. Attach a transparency log as the log sink
//! 3. Push a simulated wearable stream
//! 4. Poll for results and build HSI snapshots
//!
//! Run with: cargo run --example replay_demo

use chrono::{Duration, Utc};
use std::sync::Arc;
use synheart_emotion::{
    EmotionEngine, EngineConfig, HsiBuilder, Sample, TransparencyLog, PRIVACY_DECLARATION,
};

fn main() {
    println!("Synheart Emotion - Replay Demo");
    println!("==============================");
    println!("{PRIVACY_DECLARATION}");

    let config = EngineConfig::default()
        .with_window_duration(std::time::Duration::from_secs(30))
        .with_emission_period(std::time::Duration::from_secs(10))
        .with_min_rr_count(20);

    let transparency_log = Arc::new(TransparencyLog::new());
    let engine = match EmotionEngine::with_default_model(config.clone()) {
        Ok(engine) => engine.with_sink(transparency_log.clone()),
        Err(e) => {
            eprintln!("Could not create engine: {e}");
            return;
        }
    };
    let hsi_builder = HsiBuilder::new().with_window_duration(config.window_duration);

    // Two minutes of one-second samples: a calm first half, then rising
    // heart rate with shrinking variability.
    let start = Utc::now();
    for second in 0..120i64 {
        let now = start + Duration::seconds(second);
        let stressed = second >= 60;

        let hr = if stressed { 95.0 + (second % 5) as f64 } else { 62.0 + (second % 3) as f64 };
        let base_rr = 60_000.0 / hr;
        let jitter = if stressed { 8.0 } else { 45.0 };
        let rr: Vec<f64> = (0..2)
            .map(|beat| base_rr + if (second + beat) % 2 == 0 { jitter } else { -jitter })
            .collect();

        engine.push_at(Sample::at(now, hr, rr), now);

        // A sensor glitch every 25 seconds
        if second % 25 == 0 {
            engine.push_at(Sample::at(now, 0.0, vec![]), now);
        }

        match engine.try_emit_at(now) {
            Ok(Some(result)) => {
                println!(
                    "[{}] {} ({:.2}) hr_mean={:.1} sdnn={:.1} rmssd={:.1}",
                    now.format("%H:%M:%S"),
                    result.emotion,
                    result.confidence,
                    result.features["hr_mean"],
                    result.features["sdnn"],
                    result.features["rmssd"],
                );

                let snapshot = hsi_builder.build(&result, &engine.stats());
                println!("  HSI window: {}", snapshot.window_ids[0]);
            }
            Ok(None) => {}
            Err(e) => eprintln!("Inference failed: {e}"),
        }
    }

    println!();
    println!("{}", transparency_log.summary());
}
