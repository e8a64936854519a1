//! Replay collector that streams recorded samples from newline-delimited JSON.
//!
//! Each non-blank line must hold one [`Sample`]. Lines are parsed on a
//! background thread and forwarded over a bounded channel, so the consumer
//! sees the same producer/consumer split a live sensor callback would give.

use crate::collector::types::Sample;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Configuration for the replay collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Capacity of the sample channel
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 10_000,
        }
    }
}

/// Errors that can occur while starting collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Collector has already been started")]
    AlreadyRunning,
    #[error("Failed to spawn reader thread: {0}")]
    Spawn(String),
}

/// Streams samples parsed from a reader into a channel.
pub struct ReplayCollector {
    sender: Option<Sender<Sample>>,
    receiver: Receiver<Sample>,
    running: Arc<AtomicBool>,
    skipped_lines: Arc<AtomicU64>,
}

impl ReplayCollector {
    /// Create a new collector. Nothing is read until [`start`](Self::start).
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity.max(1));
        Self {
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            skipped_lines: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start reading samples from `reader` on a background thread.
    ///
    /// The channel disconnects once the reader is exhausted or the collector
    /// is stopped. A collector can only be started once.
    pub fn start<R>(&mut self, reader: R) -> Result<(), CollectorError>
    where
        R: BufRead + Send + 'static,
    {
        let sender = self.sender.take().ok_or(CollectorError::AlreadyRunning)?;
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let skipped = Arc::clone(&self.skipped_lines);

        thread::Builder::new()
            .name("sample-replay".to_string())
            .spawn(move || {
                read_samples(reader, &sender, &running, &skipped);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::Spawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop forwarding samples.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is still forwarding samples.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for samples.
    pub fn receiver(&self) -> &Receiver<Sample> {
        &self.receiver
    }

    /// Try to receive a sample without blocking.
    pub fn try_recv(&self) -> Option<Sample> {
        self.receiver.try_recv().ok()
    }

    /// Number of lines that could not be parsed as a sample.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }
}

fn read_samples<R: BufRead>(
    reader: R,
    sender: &Sender<Sample>,
    running: &AtomicBool,
    skipped: &AtomicU64,
) {
    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Stopping replay after read error: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut pending = match serde_json::from_str::<Sample>(&line) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::debug!("Skipping malformed sample line: {}", e);
                skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        // Bounded channel: wait for the consumer, but keep honoring stop().
        loop {
            match sender.send_timeout(pending, Duration::from_millis(100)) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(sample)) => {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    pending = sample;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}
