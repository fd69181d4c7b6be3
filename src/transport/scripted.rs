//! Scripted in-memory transport
//!
//! A [`ScriptedTransport`] behaves like a serial port whose far end is a
//! [`ScriptedHandle`] held by a test or demo. Bytes pushed through the handle
//! come out of [`Transport::read_available`] one pushed chunk at a time,
//! preserving chunk boundaries; writes are captured for inspection. Failures
//! can be injected for open, read and write.
//!
//! The handle can also run a generator thread producing telemetry lines from
//! [`SignalPattern`]s, which is what the `demo` command of the binary uses.
//!
//! # Example
//!
//! ```ignore
//! use serial_plotter::transport::ScriptedTransport;
//!
//! let (transport, handle) = ScriptedTransport::new();
//! handle.push_str("temp 21.5 hum 40\n");
//! handle.fail_next_read("cable unplugged");
//! ```

use super::Transport;
use crate::error::{PlotterError, Result};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Waveform used by the generator thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Linear ramp that resets every period
    Sawtooth { period: f64, amplitude: f64 },
    /// Square wave alternating between `amplitude` and `-amplitude`
    Square { period: f64, amplitude: f64 },
    /// Sample counter scaled by `step`
    Counter { step: f64 },
}

impl Default for SignalPattern {
    fn default() -> Self {
        SignalPattern::Sine {
            frequency: 1.0,
            amplitude: 100.0,
            offset: 0.0,
        }
    }
}

impl SignalPattern {
    /// Value of the pattern at `elapsed_secs`, for the `index`-th sample
    pub fn sample(&self, elapsed_secs: f64, index: u64) -> f64 {
        match *self {
            SignalPattern::Constant(v) => v,
            SignalPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            SignalPattern::Sawtooth { period, amplitude } => {
                let t = elapsed_secs % period;
                amplitude * (t / period)
            }
            SignalPattern::Square { period, amplitude } => {
                if elapsed_secs % period < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            SignalPattern::Counter { step } => step * index as f64,
        }
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    open: bool,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    open_error: Option<String>,
    read_error: Option<String>,
    block_writes: bool,
    opens: u32,
    closes: u32,
}

type Shared = Arc<Mutex<ScriptedState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, ScriptedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport end handed to an ingest session
pub struct ScriptedTransport {
    shared: Shared,
}

/// Far end of a [`ScriptedTransport`], cloneable across threads
#[derive(Clone)]
pub struct ScriptedHandle {
    shared: Shared,
}

impl ScriptedTransport {
    /// Create a connected transport/handle pair
    pub fn new() -> (Self, ScriptedHandle) {
        let shared = Shared::default();
        (
            Self {
                shared: shared.clone(),
            },
            ScriptedHandle { shared },
        )
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(reason) = state.open_error.take() {
            return Err(PlotterError::Transport(reason));
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut state = lock(&self.shared);
        if !state.open {
            return Err(PlotterError::Transport("scripted transport is closed".into()));
        }
        if let Some(reason) = state.read_error.take() {
            return Err(PlotterError::Transport(reason));
        }
        Ok(state.inbound.pop_front().unwrap_or_default())
    }

    fn write(&mut self, data: &[u8], deadline: Duration) -> Result<()> {
        let mut state = lock(&self.shared);
        if !state.open {
            return Err(PlotterError::Transport("scripted transport is closed".into()));
        }
        if state.block_writes {
            return Err(PlotterError::WriteTimeout(deadline));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.shared);
        if state.open {
            state.open = false;
            state.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.shared).open
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

impl ScriptedHandle {
    /// Queue one chunk of inbound bytes
    pub fn push(&self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            lock(&self.shared).inbound.push_back(bytes);
        }
    }

    /// Queue one chunk of inbound text
    pub fn push_str(&self, text: &str) {
        self.push(text.as_bytes().to_vec());
    }

    /// Number of queued chunks not yet read
    pub fn pending_chunks(&self) -> usize {
        lock(&self.shared).inbound.len()
    }

    /// Everything written to the transport so far
    pub fn written(&self) -> Vec<u8> {
        lock(&self.shared).written.clone()
    }

    /// Make the next `open` fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        lock(&self.shared).open_error = Some(reason.into());
    }

    /// Make the next `read_available` fail with `reason`
    pub fn fail_next_read(&self, reason: impl Into<String>) {
        lock(&self.shared).read_error = Some(reason.into());
    }

    /// While set, every write fails with a timeout
    pub fn set_writes_blocked(&self, blocked: bool) {
        lock(&self.shared).block_writes = blocked;
    }

    /// Close the transport from the far end, as if the device vanished
    pub fn disconnect(&self) {
        lock(&self.shared).open = false;
    }

    /// Check whether the transport is open
    pub fn is_open(&self) -> bool {
        lock(&self.shared).open
    }

    /// Number of successful opens
    pub fn open_count(&self) -> u32 {
        lock(&self.shared).opens
    }

    /// Number of closes of an open transport
    pub fn close_count(&self) -> u32 {
        lock(&self.shared).closes
    }

    /// Spawn a thread that pushes one `name value name value ...` line per
    /// tick until `stop` is set.
    ///
    /// Lines need at least two channels to satisfy the wire grammar.
    pub fn spawn_generator(
        &self,
        channels: Vec<(String, SignalPattern)>,
        rate_hz: f64,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        let handle = self.clone();
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(0.001));
        std::thread::Builder::new()
            .name("signal-generator".into())
            .spawn(move || {
                let start = Instant::now();
                let mut index = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    let elapsed = start.elapsed().as_secs_f64();
                    let mut line = String::new();
                    for (name, pattern) in &channels {
                        let _ = write!(line, "{} {:.4} ", name, pattern.sample(elapsed, index));
                    }
                    line.pop();
                    line.push('\n');
                    handle.push_str(&line);
                    index += 1;
                    std::thread::sleep(period);
                }
                tracing::debug!("Signal generator stopped after {} lines", index);
            })
    }
}
