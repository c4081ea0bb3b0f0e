//! Optional value tracing for backward passes.
//!
//! Solvers take an `Option<&mut dyn TraceSink>` and report every node value
//! they compute, which makes it possible to diff two learners node by node.

/// A value computed during a backward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trace {
    /// Accumulated value of a treeplex node.
    Treeplex {
        /// Treeplex node index.
        node: usize,
        /// Computed value.
        value: f64,
    },
    /// Value of a game-tree node.
    Game {
        /// Game node index.
        node: usize,
        /// Computed value.
        value: f64,
    },
}

/// Receives traced values.
pub trait TraceSink {
    /// Record one value.
    fn record(&mut self, trace: Trace);
}

impl TraceSink for Vec<Trace> {
    fn record(&mut self, trace: Trace) {
        self.push(trace);
    }
}

/// Forward to `sink` when present.
pub(crate) fn emit(sink: &mut Option<&mut dyn TraceSink>, trace: Trace) {
    if let Some(sink) = sink.as_deref_mut() {
        sink.record(trace);
    }
}
