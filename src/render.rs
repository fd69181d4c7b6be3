//! Redraw targets
//!
//! A [`Renderer`] receives a [`DrawRequest`]: every series in first-seen
//! order plus the optional symmetric vertical bound. The request is an owned
//! snapshot, so renderers run without holding any session lock.
//!
//! Two text renderers are provided for headless use:
//!
//! - [`SummaryRenderer`] - one human readable line per redraw
//! - [`JsonLinesRenderer`] - one JSON object per redraw
//!
//! Closures taking `&DrawRequest` also implement [`Renderer`].

use crate::error::{PlotterError, Result};
use crate::types::SeriesSnapshot;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

/// Snapshot handed to a renderer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DrawRequest {
    /// Series in first-seen order
    pub series: Vec<SeriesSnapshot>,
    /// Symmetric y-axis limit, if configured
    pub vertical_bound: Option<f64>,
}

impl DrawRequest {
    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Look up a series by name
    pub fn series(&self, name: &str) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Y-axis limits: the bound when set, otherwise the data range
    pub fn y_range(&self) -> Option<(f64, f64)> {
        if let Some(bound) = self.vertical_bound {
            return Some((-bound, bound));
        }
        self.series
            .iter()
            .filter_map(SeriesSnapshot::value_range)
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    }
}

/// Something that can draw a [`DrawRequest`]
pub trait Renderer {
    /// Draw one frame
    fn draw(&mut self, request: &DrawRequest) -> Result<()>;
}

impl<F> Renderer for F
where
    F: FnMut(&DrawRequest) -> Result<()>,
{
    fn draw(&mut self, request: &DrawRequest) -> Result<()> {
        self(request)
    }
}

/// Writes one summary line per redraw
///
/// ```text
/// [frame 3] temp: last=21.50 min=20.10 max=22.00 mean=21.03 n=120 | hum: ...
/// ```
pub struct SummaryRenderer<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> SummaryRenderer<W> {
    /// Create a renderer writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    /// Number of frames drawn
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Consume the renderer, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn format_line(&self, request: &DrawRequest) -> String {
        let mut line = format!("[frame {}]", self.frames);
        if request.is_empty() {
            line.push_str(" (no series)");
            return line;
        }
        for (i, series) in request.series.iter().enumerate() {
            line.push_str(if i == 0 { " " } else { " | " });
            let _ = write!(line, "{}:", series.name);
            match (series.last(), series.value_range(), series.mean()) {
                (Some(last), Some((min, max)), Some(mean)) => {
                    let _ = write!(
                        line,
                        " last={:.2} min={:.2} max={:.2} mean={:.2}",
                        last, min, max, mean
                    );
                }
                (Some(last), _, _) => {
                    let _ = write!(line, " last={}", last);
                }
                _ => {}
            }
            let _ = write!(line, " n={}", series.samples.len());
        }
        line
    }
}

impl<W: Write> Renderer for SummaryRenderer<W> {
    fn draw(&mut self, request: &DrawRequest) -> Result<()> {
        let line = self.format_line(request);
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        self.frames += 1;
        Ok(())
    }
}

/// Writes each redraw as one JSON object per line
pub struct JsonLinesRenderer<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    /// Create a renderer writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the renderer, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn draw(&mut self, request: &DrawRequest) -> Result<()> {
        serde_json::to_writer(&mut self.writer, request)
            .map_err(|e| PlotterError::Serialization(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
