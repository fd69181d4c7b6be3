//! Session lifecycle
//!
//! [`IngestSession`] ties the pipeline together. It owns the transport, the
//! shared [`SessionState`] and the [`UpdateScheduler`], spawns a
//! [`ReaderWorker`] on [`start`](IngestSession::start) and joins it on
//! [`stop`](IngestSession::stop).
//!
//! The session itself is the presentation context: it is driven by whoever
//! owns it (a UI event loop, the CLI) calling [`pump`](IngestSession::pump),
//! which waits for change signals and hands due redraws to a [`Renderer`].
//!
//! # States
//!
//! ```text
//! Stopped --start--> Starting --ok--> Running --stop/read error--> Stopped
//!                        \--invalid config / open failed--> Stopped
//! ```

use super::scheduler::UpdateScheduler;
use super::worker::{
    lock, ReaderWorker, SessionState, SharedState, SharedTransport, WorkerChannels,
};
use crate::config::SessionConfig;
use crate::error::{PlotterError, Result, ResultExt};
use crate::render::{DrawRequest, Renderer};
use crate::transport::Transport;
use crate::types::{IngestStats, SessionStatus};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `stop()` waits for the reader to exit
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of [`IngestSession::stop`]
#[derive(Debug)]
pub enum StopOutcome {
    /// The session was not running; nothing was done
    NotRunning,
    /// The reader exited and the transport was closed
    Stopped,
    /// The reader did not exit within the join timeout and was detached
    ReaderTimedOut,
    /// The reader had already ended on an error nobody collected
    Failed(PlotterError),
}

impl StopOutcome {
    /// The reader's error, if it had failed
    pub fn into_failure(self) -> Option<PlotterError> {
        match self {
            StopOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// How a reader thread ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderExit {
    Exited,
    Panicked,
    TimedOut,
}

/// Presentation-side handle on a running reader
struct ReaderHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
    change_rx: Receiver<()>,
    failure_rx: Receiver<PlotterError>,
    done_rx: Receiver<()>,
}

impl ReaderHandle {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for the thread to exit, then collect any failure
    fn join(self, timeout: Duration) -> (ReaderExit, Option<PlotterError>) {
        // Nothing is ever sent on `done`; the sender dropping is the signal
        if let Err(RecvTimeoutError::Timeout) = self.done_rx.recv_timeout(timeout) {
            return (ReaderExit::TimedOut, None);
        }
        let exit = match self.thread.join() {
            Ok(()) => ReaderExit::Exited,
            Err(_) => ReaderExit::Panicked,
        };
        (exit, self.failure_rx.try_recv().ok())
    }
}

/// What woke the presentation side
enum Wake {
    Changed,
    ReaderGone,
    Timeout,
}

/// One telemetry ingest session over a transport
pub struct IngestSession {
    transport: SharedTransport,
    state: SharedState,
    config: SessionConfig,
    status: SessionStatus,
    scheduler: UpdateScheduler,
    reader: Option<ReaderHandle>,
    join_timeout: Duration,
    /// Redraws handed to a renderer since start
    redraws: u64,
}

impl IngestSession {
    /// Create a stopped session over `transport`
    pub fn new(transport: Box<dyn Transport>) -> Self {
        let config = SessionConfig::default();
        Self {
            transport: Arc::new(Mutex::new(transport)),
            state: Arc::new(Mutex::new(SessionState::new(&config))),
            scheduler: UpdateScheduler::new(config.redraw),
            config,
            status: SessionStatus::Stopped,
            reader: None,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            redraws: 0,
        }
    }

    /// Set how long `stop()` waits for the reader
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Current lifecycle state.
    ///
    /// A session whose reader ended on a transport error reports `Stopped`
    /// even before the failure has been collected.
    pub fn status(&self) -> SessionStatus {
        match &self.reader {
            Some(reader) if self.status == SessionStatus::Running && !reader.is_running() => {
                SessionStatus::Stopped
            }
            _ => self.status,
        }
    }

    /// Check whether the reader is running
    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    /// Configuration of the current (or last) run
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Name of the underlying transport
    pub fn transport_name(&self) -> String {
        lock(&self.transport).name()
    }

    /// Validate `config`, open the transport, reset all state and start the reader.
    ///
    /// On any error the session stays `Stopped`; an invalid configuration is
    /// reported with the offending field (see [`PlotterError::config_field`]).
    pub fn start(&mut self, config: SessionConfig) -> Result<()> {
        if self.reader.is_some() {
            if self.status() == SessionStatus::Running {
                return Err(PlotterError::InvalidState(
                    "session is already running".into(),
                ));
            }
            // Previous run ended on a read error nobody collected
            if let Some(err) = self.reap_reader() {
                tracing::warn!("Discarding uncollected reader failure: {}", err);
            }
        }

        self.status = SessionStatus::Starting;
        tracing::info!("Session starting");

        if let Err(e) = config.validate() {
            self.status = SessionStatus::Stopped;
            tracing::warn!("Session not started: {}", e);
            return Err(e);
        }

        let opened = {
            let mut transport = lock(&self.transport);
            let name = transport.name();
            transport
                .open()
                .with_context(|| format!("Failed to open {}", name))
        };
        if let Err(e) = opened {
            self.status = SessionStatus::Stopped;
            tracing::warn!("{}", e);
            return Err(e);
        }

        // A reader detached by an earlier stop may still hold the old state
        self.state = Arc::new(Mutex::new(SessionState::new(&config)));
        self.scheduler = UpdateScheduler::new(config.redraw);
        self.redraws = 0;

        let running = Arc::new(AtomicBool::new(true));
        let (change_tx, change_rx) = bounded(1);
        let (failure_tx, failure_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let worker = ReaderWorker::new(
            &config,
            self.transport.clone(),
            self.state.clone(),
            running.clone(),
            WorkerChannels {
                change_tx,
                failure_tx,
                done_tx,
            },
        );

        let spawned = std::thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || worker.run());
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                lock(&self.transport).close();
                self.status = SessionStatus::Stopped;
                return Err(PlotterError::Io(e).with_context("Failed to spawn reader thread"));
            }
        };

        self.reader = Some(ReaderHandle {
            running,
            thread,
            change_rx,
            failure_rx,
            done_rx,
        });
        self.config = config;
        self.status = SessionStatus::Running;
        tracing::info!(
            "Session running: capacity {}, bound {:?}, redraw {}",
            self.config.capacity,
            self.config.vertical_bound,
            self.config.redraw
        );
        Ok(())
    }

    /// Stop the reader, close the transport and clear all series.
    ///
    /// Blocks until the reader has exited or the join timeout passes. Safe to
    /// call on a session that never started. A read error that ended the
    /// reader and was not yet collected is returned as
    /// [`StopOutcome::Failed`].
    pub fn stop(&mut self) -> StopOutcome {
        let Some(reader) = self.reader.take() else {
            // Also drops series kept after a read failure
            lock(&self.state).store.clear();
            self.scheduler.reset();
            self.status = SessionStatus::Stopped;
            return StopOutcome::NotRunning;
        };

        tracing::info!("Session stopping");
        reader.running.store(false, Ordering::SeqCst);

        let outcome = match reader.join(self.join_timeout) {
            (ReaderExit::TimedOut, _) => {
                tracing::warn!(
                    "Reader did not exit within {:?}; detaching it",
                    self.join_timeout
                );
                // The reader may be stuck inside a read holding the transport
                match self.transport.try_lock() {
                    Ok(mut transport) => transport.close(),
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().close(),
                    Err(TryLockError::WouldBlock) => {
                        tracing::warn!("Transport busy; leaving it to the detached reader")
                    }
                }
                // Whatever the detached reader still applies goes to the old state
                let stats = lock(&self.state).stats.clone();
                self.state = Arc::new(Mutex::new(SessionState {
                    stats,
                    ..SessionState::new(&self.config)
                }));
                StopOutcome::ReaderTimedOut
            }
            (exit, failure) => {
                lock(&self.transport).close();
                match (exit, failure) {
                    (_, Some(err)) => {
                        tracing::warn!("Reader had already failed: {}", err);
                        StopOutcome::Failed(err)
                    }
                    (ReaderExit::Panicked, None) => {
                        tracing::error!("Reader thread panicked");
                        StopOutcome::Failed(PlotterError::InvalidState(
                            "reader thread panicked".into(),
                        ))
                    }
                    _ => StopOutcome::Stopped,
                }
            }
        };

        lock(&self.state).store.clear();
        self.scheduler.reset();
        self.status = SessionStatus::Stopped;
        tracing::info!("Session stopped");
        outcome
    }

    /// Write `payload` to the transport, terminated by CRLF unless it already
    /// ends in `\n` or `\r`.
    ///
    /// A payload of only whitespace is ignored. Returns the number of bytes
    /// written. Failures leave the session running; a missed deadline is
    /// reported as a timeout (see [`PlotterError::is_timeout`]).
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        if !self.is_running() {
            return Err(PlotterError::InvalidState(
                "cannot send while the session is not running".into(),
            ));
        }
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(0);
        }

        let mut data = payload.to_vec();
        if !matches!(data.last(), Some(b'\n' | b'\r')) {
            data.extend_from_slice(b"\r\n");
        }

        lock(&self.transport)
            .write(&data, self.config.write_timeout)
            .with_context(|| format!("Failed to send {} bytes", data.len()))?;
        tracing::debug!("Sent: {}", String::from_utf8_lossy(payload).trim());
        Ok(data.len())
    }

    /// Empty every series and schedule one redraw so the display empties
    pub fn clear(&mut self) {
        lock(&self.state).store.clear();
        self.scheduler.request_redraw(Instant::now());
        tracing::debug!("Series cleared");
    }

    /// Copy the current series out under the session lock
    pub fn snapshot(&self) -> DrawRequest {
        let state = lock(&self.state);
        DrawRequest {
            series: state.store.snapshot(),
            vertical_bound: state.store.vertical_bound(),
        }
    }

    /// Take a snapshot and draw it right away, bypassing the scheduler
    pub fn redraw_now(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        let request = self.snapshot();
        renderer.draw(&request).context("Redraw failed")?;
        self.redraws += 1;
        Ok(())
    }

    /// Run the presentation side for up to `max_wait`.
    ///
    /// Change signals from the reader are fed to the scheduler; the first
    /// redraw that falls due is drawn and the call returns `Ok(true)`.
    /// Returns `Ok(false)` if nothing was drawn in time, and the reader's
    /// error if it failed (the session is then `Stopped`).
    pub fn pump(&mut self, renderer: &mut dyn Renderer, max_wait: Duration) -> Result<bool> {
        let until = Instant::now() + max_wait;
        loop {
            let now = Instant::now();
            if self.scheduler.poll(now) {
                self.redraw_now(renderer)?;
                return Ok(true);
            }
            if let Some(err) = self.poll_failure() {
                return Err(err);
            }
            if now >= until {
                return Ok(false);
            }

            let wake_at = self
                .scheduler
                .next_deadline()
                .map_or(until, |due| due.min(until));
            match self.wait(wake_at) {
                Wake::Changed => {
                    self.scheduler.notify_changed(Instant::now());
                }
                Wake::ReaderGone => {
                    if let Some(err) = self.reap_reader() {
                        return Err(err);
                    }
                }
                Wake::Timeout => {}
            }
        }
    }

    /// Collect the reader's error if it ended on its own.
    ///
    /// After this returns an error the session is `Stopped`; the last series
    /// stay readable until the next start.
    pub fn poll_failure(&mut self) -> Option<PlotterError> {
        match &self.reader {
            Some(reader) if !reader.is_running() => self.reap_reader(),
            _ => None,
        }
    }

    /// Read loop counters
    pub fn stats(&self) -> IngestStats {
        let mut stats = lock(&self.state).stats.clone();
        stats.redraws = self.redraws;
        stats
    }

    fn wait(&self, wake_at: Instant) -> Wake {
        let timeout = wake_at.saturating_duration_since(Instant::now());
        let Some(reader) = &self.reader else {
            std::thread::sleep(timeout);
            return Wake::Timeout;
        };
        select! {
            recv(reader.change_rx) -> msg => match msg {
                Ok(()) => Wake::Changed,
                Err(_) => Wake::ReaderGone,
            },
            // Never receives; disconnects when the reader thread exits
            recv(reader.done_rx) -> _ => Wake::ReaderGone,
            default(timeout) => Wake::Timeout,
        }
    }

    /// Join a reader that ended on its own and return its failure
    fn reap_reader(&mut self) -> Option<PlotterError> {
        let reader = self.reader.take()?;
        let (exit, failure) = reader.join(self.join_timeout);
        lock(&self.transport).close();
        self.scheduler.reset();
        self.status = SessionStatus::Stopped;

        match (exit, failure) {
            (_, Some(err)) => Some(err),
            (ReaderExit::Panicked, None) => Some(PlotterError::InvalidState(
                "reader thread panicked".into(),
            )),
            _ => None,
        }
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        self.stop();
    }
}
