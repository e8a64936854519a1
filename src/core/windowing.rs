//! Sliding-window sample storage.
//!
//! Samples are retained for a fixed duration and evicted by age. The store
//! is shared between a producer (sensor callback) and a consumer (inference
//! polling), so every operation applies atomically with respect to the others.

use crate::collector::types::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Summary of the samples currently buffered.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferStats {
    /// Number of buffered samples
    pub count: usize,
    /// Span between the oldest and newest buffered sample
    pub duration_ms: u64,
    /// Lowest and highest buffered heart rate
    pub hr_range: [f64; 2],
    /// Total RR intervals across buffered samples
    pub rr_count: usize,
}

/// Values gathered from every buffered sample for one emission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowAggregate {
    /// Number of samples aggregated
    pub sample_count: usize,
    /// Heart rate of each sample, in buffer order
    pub hr_values: Vec<f64>,
    /// All RR intervals, concatenated in buffer order
    pub rr_intervals: Vec<f64>,
    /// Motion readings summed per channel, absent when no sample carried motion
    pub motion: Option<BTreeMap<String, f64>>,
}

/// An ordered, time-indexed store of samples.
///
/// Implementations decide the concurrency primitive; callers only rely on
/// each method being applied as a whole.
pub trait SampleStore: Send + Sync {
    /// Append a sample, then evict everything older than `cutoff`.
    ///
    /// Returns the number of evicted samples.
    fn push(&self, sample: Sample, cutoff: DateTime<Utc>) -> usize;

    /// Evict every sample with a timestamp before `cutoff`.
    fn evict_before(&self, cutoff: DateTime<Utc>) -> usize;

    /// Gather HR, RR and motion data from all buffered samples.
    fn aggregate(&self) -> WindowAggregate;

    /// Summarize the buffered samples.
    fn stats(&self) -> BufferStats;

    /// Drop every buffered sample.
    fn clear(&self);

    /// Number of buffered samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-guarded deque implementation of [`SampleStore`].
#[derive(Debug, Default)]
pub struct WindowBuffer {
    samples: Mutex<VecDeque<Sample>>,
}

impl WindowBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        // Every mutation leaves the deque consistent, so a panic elsewhere
        // cannot leave a torn buffer behind.
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict(samples: &mut VecDeque<Sample>, cutoff: DateTime<Utc>) -> usize {
    let before = samples.len();
    // Pushes are only approximately ordered, so a straggler may sit behind
    // a newer sample; retain catches it where popping the front would not.
    samples.retain(|s| s.timestamp >= cutoff);
    before - samples.len()
}

impl SampleStore for WindowBuffer {
    fn push(&self, sample: Sample, cutoff: DateTime<Utc>) -> usize {
        let mut samples = self.lock();
        samples.push_back(sample);
        evict(&mut samples, cutoff)
    }

    fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        evict(&mut self.lock(), cutoff)
    }

    fn aggregate(&self) -> WindowAggregate {
        let samples = self.lock();

        let mut aggregate = WindowAggregate {
            sample_count: samples.len(),
            hr_values: Vec::with_capacity(samples.len()),
            rr_intervals: Vec::new(),
            motion: None,
        };

        for sample in samples.iter() {
            aggregate.hr_values.push(sample.hr);
            aggregate
                .rr_intervals
                .extend_from_slice(&sample.rr_intervals);

            if let Some(ref motion) = sample.motion {
                let totals = aggregate.motion.get_or_insert_with(BTreeMap::new);
                for (channel, value) in motion {
                    *totals.entry(channel.clone()).or_insert(0.0) += value;
                }
            }
        }

        aggregate
    }

    fn stats(&self) -> BufferStats {
        let samples = self.lock();
        if samples.is_empty() {
            return BufferStats::default();
        }

        let mut oldest = samples[0].timestamp;
        let mut newest = oldest;
        let mut hr_min = f64::INFINITY;
        let mut hr_max = f64::NEG_INFINITY;
        let mut rr_count = 0;

        for sample in samples.iter() {
            oldest = oldest.min(sample.timestamp);
            newest = newest.max(sample.timestamp);
            hr_min = hr_min.min(sample.hr);
            hr_max = hr_max.max(sample.hr);
            rr_count += sample.rr_intervals.len();
        }

        BufferStats {
            count: samples.len(),
            duration_ms: (newest - oldest).num_milliseconds().max(0) as u64,
            hr_range: [hr_min, hr_max],
            rr_count,
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(start: DateTime<Utc>, offset_ms: i64, hr: f64, rr: &[f64]) -> Sample {
        Sample::at(start + Duration::milliseconds(offset_ms), hr, rr.to_vec())
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let buffer = WindowBuffer::new();
        let stats = buffer.stats();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.duration_ms, 0);
        assert_eq!(stats.hr_range, [0.0, 0.0]);
        assert_eq!(stats.rr_count, 0);
    }

    #[test]
    fn test_push_evicts_old_samples() {
        let buffer = WindowBuffer::new();
        let start = Utc::now();
        let window = Duration::milliseconds(5000);

        for i in 0..11 {
            let now = start + Duration::seconds(i);
            buffer.push(Sample::at(now, 70.0, vec![800.0]), now - window);
        }

        // Samples at 5s..=10s survive a cutoff of 5s.
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.stats().duration_ms, 5000);
    }

    #[test]
    fn test_eviction_catches_out_of_order_sample() {
        let buffer = WindowBuffer::new();
        let start = Utc::now();

        buffer.push(sample(start, 10_000, 70.0, &[800.0]), start);
        buffer.push(sample(start, 1_000, 71.0, &[800.0]), start);
        assert_eq!(buffer.len(), 2);

        let evicted = buffer.evict_before(start + Duration::seconds(5));
        assert_eq!(evicted, 1);
        assert_eq!(buffer.stats().hr_range, [70.0, 70.0]);
    }

    #[test]
    fn test_aggregate_sums_motion_per_channel() {
        let buffer = WindowBuffer::new();
        let start = Utc::now();

        let mut m1 = BTreeMap::new();
        m1.insert("accel_x".to_string(), 0.5);
        let mut m2 = BTreeMap::new();
        m2.insert("accel_x".to_string(), 1.0);
        m2.insert("accel_y".to_string(), 2.0);

        buffer.push(sample(start, 0, 70.0, &[800.0, 810.0]).with_motion(m1), start);
        buffer.push(sample(start, 1000, 75.0, &[790.0]), start);
        buffer.push(sample(start, 2000, 80.0, &[780.0]).with_motion(m2), start);

        let agg = buffer.aggregate();
        assert_eq!(agg.sample_count, 3);
        assert_eq!(agg.hr_values, vec![70.0, 75.0, 80.0]);
        assert_eq!(agg.rr_intervals, vec![800.0, 810.0, 790.0, 780.0]);

        let motion = agg.motion.unwrap();
        assert_eq!(motion["accel_x"], 1.5);
        assert_eq!(motion["accel_y"], 2.0);
    }

    #[test]
    fn test_stats_ranges_and_clear() {
        let buffer = WindowBuffer::new();
        let start = Utc::now();

        buffer.push(sample(start, 0, 65.0, &[900.0, 910.0]), start);
        buffer.push(sample(start, 2500, 90.0, &[700.0]), start);

        let stats = buffer.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.duration_ms, 2500);
        assert_eq!(stats.hr_range, [65.0, 90.0]);
        assert_eq!(stats.rr_count, 3);
        assert_eq!(stats, buffer.stats());

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
