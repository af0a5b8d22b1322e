//! Operator-facing failure reporting.
//!
//! The core only produces message text; how it reaches a human is up to the sink.

pub trait Diagnostics {
    fn report(&mut self, message: &str);
}

/// Forwards every message to the `log` facade at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&mut self, message: &str) {
        log::error!("{}", message);
    }
}

/// Keeps messages in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectedDiagnostics {
    pub messages: Vec<String>,
}

impl Diagnostics for CollectedDiagnostics {
    fn report(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
