/// Trajectory recorder: rolling window of the player's recent positions.
///
/// Samples are keyed by absolute clock time while live. `snapshot()`
/// re-bases them to start at zero and hands out an immutable `Timeline`
/// that an echo can replay without ever looking back at the recorder.
///
/// Storage is a bounded ring (`VecDeque` with a fixed capacity). Two rules
/// trim it:
///   - time window: anything older than `now - window_ms` is dropped
///   - capacity: a push into a full ring evicts the oldest sample

use std::collections::VecDeque;

use super::geom::Vec2;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TimeSample {
    pub t: f64, // ms
    pub pos: Vec2,
}

/// Ordered samples, non-decreasing in `t`, first sample at `t = 0`
/// when produced by a recorder.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    samples: Vec<TimeSample>,
}

impl Timeline {
    /// Build a timeline. A sample whose time runs backwards is clamped
    /// to its predecessor so ordering always holds.
    pub fn from_samples(mut samples: Vec<TimeSample>) -> Self {
        for i in 1..samples.len() {
            if samples[i].t < samples[i - 1].t {
                samples[i].t = samples[i - 1].t;
            }
        }
        Timeline { samples }
    }

    pub fn samples(&self) -> &[TimeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TimeSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TimeSample> {
        self.samples.last()
    }

    /// Total duration = last sample's elapsed time.
    pub fn duration(&self) -> f64 {
        self.samples.last().map(|s| s.t).unwrap_or(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct Recorder {
    window_ms: f64,
    capacity: usize,
    buf: VecDeque<TimeSample>,
}

impl Recorder {
    pub fn new(window_ms: f64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Recorder { window_ms, capacity, buf: VecDeque::with_capacity(capacity) }
    }

    /// Append a sample at absolute time `t`, then trim the window.
    pub fn record(&mut self, pos: Vec2, t: f64) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(TimeSample { t, pos });

        let cutoff = t - self.window_ms;
        while self.buf.front().map_or(false, |s| s.t < cutoff) {
            self.buf.pop_front();
        }
    }

    /// Re-based copy of the retained samples, or `None` when fewer than
    /// `min_samples` are held. Never mutates the recording.
    pub fn snapshot(&self, min_samples: usize) -> Option<Timeline> {
        if self.buf.len() < min_samples || self.buf.is_empty() {
            return None;
        }
        let t0 = self.buf.front()?.t;
        let samples = self.buf.iter()
            .map(|s| TimeSample { t: s.t - t0, pos: s.pos })
            .collect();
        Some(Timeline::from_samples(samples))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Absolute time of the oldest retained sample.
    pub fn oldest(&self) -> Option<f64> {
        self.buf.front().map(|s| s.t)
    }
}
