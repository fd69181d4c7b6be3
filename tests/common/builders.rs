//! Test data builders for creating test objects

use serial_plotter::{RedrawPolicy, SessionConfig};
use std::fmt::Write as _;
use std::time::Duration;

/// Builder for session configurations used in tests
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn bound(mut self, bound: f64) -> Self {
        self.config.vertical_bound = Some(bound);
        self
    }

    pub fn fixed_rate(mut self, interval: Duration) -> Self {
        self.config.redraw = RedrawPolicy::FixedRate { interval };
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Format one wire line from `(name, value)` pairs
pub fn record_line(pairs: &[(&str, f64)]) -> String {
    let mut line = String::new();
    for (name, value) in pairs {
        let _ = write!(line, "{} {} ", name, value);
    }
    line.pop();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfigBuilder::new().capacity(20).bound(5.0).build();

        assert_eq!(config.capacity, 20);
        assert_eq!(config.vertical_bound, Some(5.0));
        assert_eq!(config.redraw, RedrawPolicy::Immediate);
    }

    #[test]
    fn test_record_line() {
        assert_eq!(record_line(&[("a", 1.0), ("b", -2.5)]), "a 1 b -2.5\n");
    }
}
