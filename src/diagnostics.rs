// Warning channel for tolerable parse anomalies.
// A sink is passed into every parse call so tests can assert on emitted
// warnings without capturing process-wide output streams.

/// Write-only sink for non-fatal diagnostics. Warnings never affect
/// control flow and are never acknowledged.
pub trait DiagnosticsSink {
    fn warn(&mut self, message: &str);
}

/// Forwards warnings to the `tracing` subscriber. The CLI default.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Collects warnings in memory.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
    warnings: Vec<String>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl DiagnosticsSink for CollectedDiagnostics {
    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}
