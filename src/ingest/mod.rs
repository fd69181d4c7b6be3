//! Telemetry ingest pipeline
//!
//! Bytes from a [`Transport`](crate::transport::Transport) become named time
//! series and rate-limited redraws:
//!
//! ```text
//! bytes -> Utf8Decoder -> FrameAssembler -> RecordParser -> SeriesStore
//!                                                               |
//!                                                         change signal
//!                                                               v
//!                                    Renderer <- snapshot <- UpdateScheduler
//! ```
//!
//! # Components
//!
//! - [`FrameAssembler`] / [`Utf8Decoder`] - chunked bytes to complete lines
//! - [`RecordParser`] - one line to `(name, value)` pairs
//! - [`SeriesStore`] - bounded, clamped per-series histories in first-seen order
//! - [`UpdateScheduler`] - immediate-coalesced or fixed-rate redraw decisions
//! - [`ReaderWorker`] - the read loop, run on its own thread
//! - [`IngestSession`] - lifecycle, outbound writes and the presentation side
//!
//! # Threads
//!
//! The reader thread is the only writer of series data and the only user of
//! the frame buffer. The thread that owns the [`IngestSession`] is the only
//! reader of series data for drawing and the only user of the scheduler. Both
//! go through one mutex around [`SessionState`]; redraws copy the data out
//! and render after the lock is released.
//!
//! # Example
//!
//! ```ignore
//! use serial_plotter::ingest::IngestSession;
//! use serial_plotter::render::SummaryRenderer;
//! use serial_plotter::transport::ScriptedTransport;
//! use serial_plotter::SessionConfig;
//! use std::time::Duration;
//!
//! let (transport, handle) = ScriptedTransport::new();
//! let mut session = IngestSession::new(Box::new(transport));
//! session.start(SessionConfig::default())?;
//!
//! handle.push_str("temp 21.5 hum 40\n");
//! let mut renderer = SummaryRenderer::new(std::io::stdout());
//! session.pump(&mut renderer, Duration::from_millis(100))?;
//! session.stop();
//! ```

pub mod frame;
pub mod record;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod worker;

pub use frame::{Decoded, FrameAssembler, Utf8Decoder};
pub use record::{Record, RecordError, RecordParser};
pub use scheduler::UpdateScheduler;
pub use session::{IngestSession, StopOutcome, DEFAULT_JOIN_TIMEOUT};
pub use store::SeriesStore;
pub use worker::{ReaderWorker, SessionState, SharedState, RAW_TARGET};
