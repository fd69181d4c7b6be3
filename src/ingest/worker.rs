//! Reader thread
//!
//! The [`ReaderWorker`] owns the decoding side of the pipeline (UTF-8
//! decoder, frame assembler, parser) and runs in its own thread while a
//! session is running. Every non-empty chunk goes through:
//!
//! ```text
//! transport bytes -> Utf8Decoder -> FrameAssembler -> RecordParser -> SeriesStore
//! ```
//!
//! and, if the store changed, one change signal is offered to the
//! presentation side.
//!
//! # Communication
//!
//! - `change_tx` (capacity 1) - "data changed" signal; a full channel means a
//!   signal is already outstanding, so bursts collapse into one
//! - `failure_tx` (capacity 1) - the transport error that ended the loop
//! - `_done` - dropped when the thread exits, however it exits; the session
//!   waits on the matching receiver in `stop()`
//!
//! The running flag is checked between read attempts, so a stop request is
//! observed within one read plus one idle sleep.

use super::frame::{FrameAssembler, Utf8Decoder};
use super::record::RecordParser;
use super::store::SeriesStore;
use crate::config::SessionConfig;
use crate::error::{PlotterError, Result};
use crate::transport::Transport;
use crate::types::IngestStats;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Tracing target for raw-data echo
pub const RAW_TARGET: &str = "serial_plotter::raw";

/// State shared between the reader and the presentation side
#[derive(Debug, Default)]
pub struct SessionState {
    /// Rolling histories
    pub store: SeriesStore,
    /// Read loop counters
    pub stats: IngestStats,
}

impl SessionState {
    /// Fresh state for a session with `config`
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            store: SeriesStore::from_config(config),
            stats: IngestStats::default(),
        }
    }
}

/// Session state behind the session lock
pub type SharedState = Arc<Mutex<SessionState>>;

/// Transport shared by the reader (reads) and the session (writes, close)
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read loop of one running session
pub struct ReaderWorker {
    transport: SharedTransport,
    state: SharedState,
    running: Arc<AtomicBool>,
    change_tx: Sender<()>,
    failure_tx: Sender<PlotterError>,
    _done: Sender<()>,
    decoder: Utf8Decoder,
    assembler: FrameAssembler,
    parser: RecordParser,
    echo_raw: bool,
    idle_sleep: Duration,
    /// Chunks read since start, used to number the raw echo
    chunk_counter: u64,
}

/// Channel ends the worker reports through
pub struct WorkerChannels {
    /// "Data changed" signal
    pub change_tx: Sender<()>,
    /// Fatal read error
    pub failure_tx: Sender<PlotterError>,
    /// Dropped on thread exit
    pub done_tx: Sender<()>,
}

impl ReaderWorker {
    /// Create a worker for one session run
    pub fn new(
        config: &SessionConfig,
        transport: SharedTransport,
        state: SharedState,
        running: Arc<AtomicBool>,
        channels: WorkerChannels,
    ) -> Self {
        Self {
            transport,
            state,
            running,
            change_tx: channels.change_tx,
            failure_tx: channels.failure_tx,
            _done: channels.done_tx,
            decoder: Utf8Decoder::new(),
            assembler: FrameAssembler::with_max_line_len(config.max_line_len),
            parser: RecordParser::new(),
            echo_raw: config.echo_raw,
            idle_sleep: config.idle_sleep,
            chunk_counter: 0,
        }
    }

    /// Run until the running flag is cleared or the transport fails
    pub fn run(mut self) {
        tracing::info!("Reader started");

        while self.running.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(true) => {}
                Ok(false) => std::thread::sleep(self.idle_sleep),
                Err(e) => {
                    tracing::error!("Read failed, stopping session: {}", e);
                    self.running.store(false, Ordering::SeqCst);
                    lock(&self.transport).close();
                    let _ = self.failure_tx.try_send(e.with_context("Reader stopped"));
                    break;
                }
            }
        }

        tracing::info!("Reader stopped after {} chunks", self.chunk_counter);
    }

    /// Read and process at most one chunk.
    ///
    /// Returns whether any bytes were read.
    pub fn poll_once(&mut self) -> Result<bool> {
        let chunk = lock(&self.transport).read_available()?;
        if chunk.is_empty() {
            return Ok(false);
        }
        tracing::trace!("Chunk {}: {} bytes", self.chunk_counter, chunk.len());

        let decoded = self.decoder.decode(&chunk);
        if decoded.errors > 0 {
            tracing::debug!(
                "Replaced {} invalid byte sequences in chunk {}",
                decoded.errors,
                self.chunk_counter
            );
        }
        if self.echo_raw {
            tracing::info!(
                target: RAW_TARGET,
                "[chunk {}]: {}",
                self.chunk_counter,
                collapse_line_breaks(&decoded.text).trim()
            );
        }
        self.chunk_counter += 1;

        let discarded_before = self.assembler.discarded();
        let mut changed = false;
        {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            state.stats.chunks_received += 1;
            state.stats.bytes_received += chunk.len() as u64;
            state.stats.decode_errors += decoded.errors as u64;

            for line in self.assembler.feed(&decoded.text) {
                state.stats.lines_received += 1;
                match self.parser.parse(&line) {
                    Ok(record) => {
                        state.stats.rejected_pairs += record.rejected_pairs as u64;
                        if record.is_empty() {
                            continue;
                        }
                        let pairs = record.pairs.iter().map(|(n, v)| (n.as_str(), *v));
                        changed |= state.store.apply_all(pairs);
                        state.stats.records_applied += 1;
                    }
                    Err(e) => {
                        tracing::debug!("Dropping line '{}': {}", line, e);
                        state.stats.malformed_lines += 1;
                    }
                }
            }
            state.stats.oversized_lines += self.assembler.discarded() - discarded_before;
        }

        if changed {
            // Full means a signal is already outstanding
            let _ = self.change_tx.try_send(());
        }
        Ok(true)
    }
}

/// Replace each run of `\r`/`\n` with a single space
fn collapse_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c == '\r' || c == '\n' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
