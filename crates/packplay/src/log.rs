//! Append-only record of everything the pipeline's external tools printed.

/// Ordered text chunks: one synthesized line per command plus every piece of
/// combined stdout/stderr output, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    chunks: Vec<String>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Full log text, chunks concatenated verbatim.
    pub fn text(&self) -> String {
        self.chunks.concat()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }
}
