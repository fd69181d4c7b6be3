//! Scripted transport and renderer helpers

use serial_plotter::transport::{ScriptedHandle, ScriptedTransport};
use serial_plotter::{DrawRequest, IngestSession, Renderer, Result};

/// Create a stopped session over a fresh scripted transport
pub fn scripted_session() -> (IngestSession, ScriptedHandle) {
    let (transport, handle) = ScriptedTransport::new();
    (IngestSession::new(Box::new(transport)), handle)
}

/// Renderer that keeps every request it is given
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<DrawRequest>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&DrawRequest> {
        self.frames.last()
    }

    /// Samples of `name` in the most recent frame
    pub fn last_samples(&self, name: &str) -> Option<Vec<f64>> {
        self.last()?.series(name).map(|s| s.samples.clone())
    }
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, request: &DrawRequest) -> Result<()> {
        self.frames.push(request.clone());
        Ok(())
    }
}
