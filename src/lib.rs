//! # Serial Plotter: serial telemetry ingestion
//!
//! Reads a continuous byte stream from a serial port, decodes it into named
//! numeric time series, keeps a bounded rolling history per series and drives
//! rate-limited redraws of those histories.
//!
//! ## Architecture
//!
//! - **Transport**: Serial port (via `serialport`) or a scripted in-memory
//!   transport, behind the [`transport::Transport`] trait
//! - **Reader**: A dedicated thread decoding bytes into lines, records and
//!   samples
//! - **Presentation**: The owner of an [`IngestSession`] pumps change signals
//!   through the [`ingest::UpdateScheduler`] and hands snapshots to a
//!   [`render::Renderer`]
//! - **Communication**: Crossbeam channels for change and failure signals,
//!   one mutex around the shared series state
//!
//! ## Wire Format
//!
//! Lines terminated by `\n` or `\r`, each holding at least two
//! `name value` pairs:
//!
//! ```text
//! temp 21.5 hum 40.2
//! ```
//!
//! ## Configuration
//!
//! Settings are stored as TOML in the platform config directory under
//! `dev.serial-plotter`:
//!
//! - **Linux**: `~/.config/dev.serial-plotter/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.serial-plotter/config.toml`
//! - **Windows**: `%APPDATA%\dev.serial-plotter\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use serial_plotter::{
//!     config::SerialConfig, render::SummaryRenderer, transport::SerialTransport,
//!     IngestSession, SessionConfig,
//! };
//! use std::time::Duration;
//!
//! fn main() -> serial_plotter::Result<()> {
//!     let transport = SerialTransport::new(SerialConfig::new("/dev/ttyUSB0", 115_200));
//!     let mut session = IngestSession::new(Box::new(transport));
//!     session.start(SessionConfig::from_input("500", "unbounded", "1/30")?)?;
//!
//!     let mut renderer = SummaryRenderer::new(std::io::stdout());
//!     while session.is_running() {
//!         session.pump(&mut renderer, Duration::from_millis(100))?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod render;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{PlotterConfig, RedrawPolicy, SerialConfig, SessionConfig};
pub use error::{PlotterError, Result, ResultExt};
pub use ingest::{IngestSession, StopOutcome};
pub use render::{DrawRequest, Renderer};
pub use types::{IngestStats, Series, SeriesSnapshot, SessionStatus};
