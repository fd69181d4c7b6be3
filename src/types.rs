//! Core data types for the serial plotter
//!
//! This module contains the fundamental data structures shared between the
//! reader and the presentation side of an ingest session.
//!
//! # Main Types
//!
//! - [`Series`] - A named, capacity-bounded ring buffer of samples
//! - [`SeriesSnapshot`] - An owned copy of a series handed to renderers
//! - [`SessionStatus`] - Lifecycle state of an ingest session
//! - [`IngestStats`] - Diagnostic counters for the read loop
//!
//! # Memory Management
//!
//! Series data is stored in a ring buffer whose size is the session's
//! horizontal capacity ([`DEFAULT_CAPACITY`] unless configured). When the
//! buffer is full the oldest sample is evicted.

use serde::Serialize;
use std::collections::VecDeque;

/// Default number of samples retained per series
pub const DEFAULT_CAPACITY: usize = 500;

/// Time series storage for one named channel
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Name as it appeared on the wire
    name: String,
    /// Ring buffer of samples, oldest first
    samples: VecDeque<f64>,
}

impl Series {
    /// Create an empty series with room for `capacity` samples
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY * 4)),
        }
    }

    /// Series name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a sample, evicting from the front until the length fits `capacity`.
    ///
    /// Returns the most recently evicted sample, if any.
    pub fn push(&mut self, value: f64, capacity: usize) -> Option<f64> {
        let capacity = capacity.max(1);
        let mut evicted = None;
        while self.samples.len() >= capacity {
            evicted = self.samples.pop_front();
        }
        self.samples.push_back(value);
        evicted
    }

    /// Samples in arrival order
    pub fn samples(&self) -> &VecDeque<f64> {
        &self.samples
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Copy the series out for rendering
    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            name: self.name.clone(),
            samples: self.samples.iter().copied().collect(),
        }
    }
}

/// Owned copy of a series, taken under the session lock and rendered after
/// the lock is released
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    /// Series name
    pub name: String,
    /// Samples, oldest first (x-axis = index)
    pub samples: Vec<f64>,
}

impl SeriesSnapshot {
    /// Most recent sample
    pub fn last(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    /// Get the value range of the finite samples
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut finite = self.samples.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;
        Some(finite.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }

    /// Mean of the finite samples
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Lifecycle state of an ingest session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No transport open, no reader running
    #[default]
    Stopped,
    /// Validating configuration and opening the transport
    Starting,
    /// Reader thread is consuming the transport
    Running,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Stopped => write!(f, "Stopped"),
            SessionStatus::Starting => write!(f, "Starting..."),
            SessionStatus::Running => write!(f, "Running"),
        }
    }
}

/// Statistics about the read loop
///
/// All counters are zeroed when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Number of non-empty chunks read from the transport
    pub chunks_received: u64,
    /// Total bytes read
    pub bytes_received: u64,
    /// Non-empty lines produced by the frame assembler
    pub lines_received: u64,
    /// Lines that yielded at least one sample
    pub records_applied: u64,
    /// Lines rejected for token count
    pub malformed_lines: u64,
    /// Individual pairs skipped because the value was not numeric
    pub rejected_pairs: u64,
    /// Invalid byte sequences replaced during decoding
    pub decode_errors: u64,
    /// Lines discarded for exceeding the length cap
    pub oversized_lines: u64,
    /// Redraws handed to the renderer
    pub redraws: u64,
}

impl IngestStats {
    /// Fraction of lines that were rejected, as a percentage
    pub fn malformed_rate(&self) -> f64 {
        if self.lines_received == 0 {
            0.0
        } else {
            (self.malformed_lines as f64 / self.lines_received as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_ring_buffer() {
        let mut series = Series::new("temp", 10);

        for i in 0..25 {
            series.push(i as f64, 10);
        }

        assert_eq!(series.len(), 10);
        let stored: Vec<f64> = series.samples().iter().copied().collect();
        let expected: Vec<f64> = (15..25).map(|i| i as f64).collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_series_push_reports_eviction() {
        let mut series = Series::new("a", 2);
        assert_eq!(series.push(1.0, 2), None);
        assert_eq!(series.push(2.0, 2), None);
        assert_eq!(series.push(3.0, 2), Some(1.0));
        assert_eq!(series.last(), Some(3.0));
    }

    #[test]
    fn test_series_shrinks_to_smaller_capacity() {
        let mut series = Series::new("a", 5);
        for i in 0..5 {
            series.push(i as f64, 5);
        }
        series.push(5.0, 2);
        assert_eq!(series.samples().iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_snapshot_statistics() {
        let snap = SeriesSnapshot {
            name: "x".into(),
            samples: vec![1.0, f64::NAN, 3.0, -2.0],
        };
        assert_eq!(snap.value_range(), Some((-2.0, 3.0)));
        assert!((snap.mean().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(snap.last(), Some(-2.0));

        let empty = SeriesSnapshot {
            name: "y".into(),
            samples: vec![],
        };
        assert_eq!(empty.value_range(), None);
        assert_eq!(empty.mean(), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Stopped.to_string(), "Stopped");
        assert_eq!(SessionStatus::Running.to_string(), "Running");
        assert_eq!(SessionStatus::default(), SessionStatus::Stopped);
    }

    #[test]
    fn test_malformed_rate() {
        let stats = IngestStats {
            lines_received: 4,
            malformed_lines: 1,
            ..Default::default()
        };
        assert!((stats.malformed_rate() - 25.0).abs() < f64::EPSILON);
        assert_eq!(IngestStats::default().malformed_rate(), 0.0);
    }
}
