//! Per-session ingest configuration
//!
//! A [`SessionConfig`] is fixed for the lifetime of one ingest session. It can
//! be built in code, deserialized from the config file, or parsed from the
//! free-text fields a user interface collects with
//! [`SessionConfig::from_input`].
//!
//! # Redraw Policies
//!
//! - [`RedrawPolicy::Immediate`] - coalesce bursts and redraw 10 ms after the
//!   first change
//! - [`RedrawPolicy::FixedRate`] - redraw at most once per interval, dropping
//!   changes that arrive in between

use crate::error::{PlotterError, Result};
use crate::types::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between the first change signal and the coalesced redraw
pub const IMMEDIATE_REDRAW_DELAY: Duration = Duration::from_millis(10);

/// The "30 times per second" fixed-rate option
pub const DEFAULT_FIXED_RATE_HZ: f64 = 30.0;

/// Default deadline for outbound writes
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default reader sleep when the transport has no bytes available
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Default cap on a single line, in bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Literals accepted as "no vertical bound"
const UNBOUNDED_LITERALS: &[&str] = &["", "unbounded", "none", "off"];

/// When to redraw after the data changed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RedrawPolicy {
    /// Redraw shortly after the first change, coalescing everything until then
    #[default]
    Immediate,
    /// Redraw at most once per `interval`
    FixedRate {
        #[serde(with = "duration_secs")]
        interval: Duration,
    },
}

impl RedrawPolicy {
    /// Fixed-rate policy with `hz` redraws per second
    pub fn fixed_hz(hz: f64) -> Self {
        RedrawPolicy::FixedRate {
            interval: secs_to_duration(1.0 / hz),
        }
    }

    /// Parse a redraw mode as typed by a user.
    ///
    /// Accepts `immediate`/`realtime`, `<n>hz`, `1/<n>`, `<x>s` and `<x>ms`.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim().to_ascii_lowercase();
        let invalid = || {
            PlotterError::config(
                "redraw",
                format!(
                    "unknown redraw mode '{}' (expected 'immediate', '<n>hz', '1/<n>' or '<seconds>s')",
                    input.trim()
                ),
            )
        };

        let policy = match text.as_str() {
            "immediate" | "realtime" | "real-time" => RedrawPolicy::Immediate,
            _ => {
                let interval = if let Some(hz) = text.strip_suffix("hz") {
                    let hz: f64 = hz.trim().parse().map_err(|_| invalid())?;
                    if !(hz.is_finite() && hz > 0.0) {
                        return Err(invalid());
                    }
                    1.0 / hz
                } else if let Some(divisor) = text.strip_prefix("1/") {
                    let hz: f64 = divisor.trim().trim_end_matches("s").parse().map_err(|_| invalid())?;
                    if !(hz.is_finite() && hz > 0.0) {
                        return Err(invalid());
                    }
                    1.0 / hz
                } else if let Some(ms) = text.strip_suffix("ms") {
                    ms.trim().parse::<f64>().map_err(|_| invalid())? / 1000.0
                } else if let Some(secs) = text.strip_suffix('s') {
                    secs.trim().parse::<f64>().map_err(|_| invalid())?
                } else {
                    return Err(invalid());
                };
                if !(interval.is_finite() && interval > 0.0) {
                    return Err(invalid());
                }
                RedrawPolicy::FixedRate {
                    interval: secs_to_duration(interval),
                }
            }
        };
        Ok(policy)
    }
}

impl std::fmt::Display for RedrawPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedrawPolicy::Immediate => write!(f, "immediate"),
            RedrawPolicy::FixedRate { interval } => {
                write!(f, "{:.1} Hz", 1.0 / interval.as_secs_f64())
            }
        }
    }
}

/// Configuration for one ingest session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Samples kept per series (horizontal capacity)
    pub capacity: usize,

    /// Symmetric clamp applied to every incoming sample
    pub vertical_bound: Option<f64>,

    /// Redraw cadence
    pub redraw: RedrawPolicy,

    /// Deadline for outbound writes
    #[serde(with = "duration_millis")]
    pub write_timeout: Duration,

    /// Reader sleep when no bytes are available
    #[serde(with = "duration_millis")]
    pub idle_sleep: Duration,

    /// Log every received chunk on the `serial_plotter::raw` target
    pub echo_raw: bool,

    /// Discard any line longer than this many bytes
    pub max_line_len: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            vertical_bound: None,
            redraw: RedrawPolicy::Immediate,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            echo_raw: false,
            max_line_len: Some(DEFAULT_MAX_LINE_LEN),
        }
    }
}

impl SessionConfig {
    /// Build a configuration from the three user-editable text fields.
    ///
    /// Every other setting keeps its default. The returned error names the
    /// first field that failed to parse.
    pub fn from_input(capacity: &str, vertical_bound: &str, redraw: &str) -> Result<Self> {
        let config = Self {
            capacity: parse_capacity(capacity)?,
            vertical_bound: parse_vertical_bound(vertical_bound)?,
            redraw: RedrawPolicy::parse(redraw)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the horizontal capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the vertical bound
    pub fn with_vertical_bound(mut self, bound: Option<f64>) -> Self {
        self.vertical_bound = bound;
        self
    }

    /// Set the redraw policy
    pub fn with_redraw(mut self, redraw: RedrawPolicy) -> Self {
        self.redraw = redraw;
        self
    }

    /// Check every field, reporting the first invalid one
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PlotterError::config(
                "capacity",
                "must be a positive integer",
            ));
        }
        if let Some(bound) = self.vertical_bound {
            if !(bound.is_finite() && bound > 0.0) {
                return Err(PlotterError::config(
                    "vertical_bound",
                    format!("must be a positive number, got {}", bound),
                ));
            }
        }
        if let RedrawPolicy::FixedRate { interval } = self.redraw {
            if interval.is_zero() {
                return Err(PlotterError::config(
                    "redraw",
                    "fixed-rate interval must be greater than zero",
                ));
            }
        }
        if self.write_timeout.is_zero() {
            return Err(PlotterError::config(
                "write_timeout",
                "must be greater than zero",
            ));
        }
        if self.idle_sleep.is_zero() {
            return Err(PlotterError::config(
                "idle_sleep",
                "must be greater than zero",
            ));
        }
        if self.max_line_len == Some(0) {
            return Err(PlotterError::config(
                "max_line_len",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

/// Convert fractional seconds to a duration rounded to the nearest nanosecond
fn secs_to_duration(secs: f64) -> Duration {
    Duration::from_nanos((secs * 1e9).round() as u64)
}

/// Parse the horizontal capacity field
pub fn parse_capacity(input: &str) -> Result<usize> {
    let text = input.trim();
    match text.parse::<usize>() {
        Ok(0) | Err(_) => Err(PlotterError::config(
            "capacity",
            format!("'{}' is not a positive integer", text),
        )),
        Ok(n) => Ok(n),
    }
}

/// Parse the vertical bound field; the unbounded literals yield `None`
pub fn parse_vertical_bound(input: &str) -> Result<Option<f64>> {
    let text = input.trim();
    if UNBOUNDED_LITERALS
        .iter()
        .any(|lit| text.eq_ignore_ascii_case(lit))
    {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
        _ => Err(PlotterError::config(
            "vertical_bound",
            format!("'{}' is not a positive number or 'unbounded'", text),
        )),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !(secs.is_finite() && secs >= 0.0) {
            return Err(serde::de::Error::custom(format!(
                "invalid interval {} seconds",
                secs
            )));
        }
        Ok(super::secs_to_duration(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
