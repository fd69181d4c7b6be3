//! Per-series rolling histories
//!
//! The store keeps one [`Series`] per name, in the order names were first
//! seen. That order is what renderers use for legends and draw order, so it
//! is tracked explicitly instead of relying on map iteration order.

use crate::config::SessionConfig;
use crate::types::{Series, SeriesSnapshot, DEFAULT_CAPACITY};
use std::collections::HashMap;

/// Bounded, clamped sample storage keyed by series name
#[derive(Debug, Clone)]
pub struct SeriesStore {
    /// Samples kept per series
    capacity: usize,
    /// Symmetric clamp applied on insert
    vertical_bound: Option<f64>,
    /// Series in first-seen order
    series: Vec<Series>,
    /// Name to position in `series`
    index: HashMap<String, usize>,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl SeriesStore {
    /// Create an empty store; a capacity of zero is treated as one
    pub fn new(capacity: usize, vertical_bound: Option<f64>) -> Self {
        Self {
            capacity: capacity.max(1),
            vertical_bound,
            series: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create an empty store using the limits of a session configuration
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.capacity, config.vertical_bound)
    }

    /// Horizontal capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Vertical bound, if any
    pub fn vertical_bound(&self) -> Option<f64> {
        self.vertical_bound
    }

    /// Append `value` to the series called `name`, creating it if unseen.
    ///
    /// Returns whether what should be displayed changed. Every successful
    /// append counts as a change.
    pub fn apply(&mut self, name: &str, value: f64) -> bool {
        let value = self.clamp(value);
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                tracing::debug!("New series '{}'", name);
                let idx = self.series.len();
                self.series.push(Series::new(name, self.capacity));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        self.series[idx].push(value, self.capacity);
        true
    }

    /// Apply every pair in order; returns whether any of them changed the store
    pub fn apply_all<'a, I>(&mut self, pairs: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        pairs
            .into_iter()
            .fold(false, |changed, (name, value)| self.apply(name, value) | changed)
    }

    /// Remove every series and forget the first-seen order
    pub fn clear(&mut self) {
        self.series.clear();
        self.index.clear();
    }

    /// Look up a series by name
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.index.get(name).map(|&idx| &self.series[idx])
    }

    /// Series names in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(Series::name)
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no series exist
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Iterate over series in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    /// Copy every series out, in first-seen order
    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        self.series.iter().map(Series::snapshot).collect()
    }

    /// Clamp `value` to `[-bound, bound]`; NaN passes through unchanged
    pub fn clamp(&self, value: f64) -> f64 {
        match self.vertical_bound {
            Some(bound) if value > bound => bound,
            Some(bound) if value < -bound => -bound,
            _ => value,
        }
    }
}
