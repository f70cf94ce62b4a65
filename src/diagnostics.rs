//! Progress and warning reporting for the compiler stages.
//!
//! Stages never log directly; they report to the [`DiagnosticsSink`] they are
//! handed. [`TracingSink`] forwards to `tracing`, [`MemorySink`] keeps the
//! messages for inspection.

use std::sync::Mutex;

/// Severity of a reported message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Success,
}

pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }
}

/// Forwards to the `tracing` macros under the `rusty_table` target.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!(target: "rusty_table", "{message}"),
            Level::Warning => tracing::warn!(target: "rusty_table", "{message}"),
            Level::Success => tracing::info!(target: "rusty_table", success = true, "{message}"),
        }
    }
}

/// Records every message in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages of one level, in order.
    pub fn of(&self, level: Level) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn report(&self, level: Level, message: &str) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push((level, message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order_and_level() {
        let sink = MemorySink::new();
        sink.info("collecting");
        sink.warning("no primary key");
        sink.success("done");
        assert_eq!(sink.messages(), vec![
            (Level::Info, "collecting".to_owned()),
            (Level::Warning, "no primary key".to_owned()),
            (Level::Success, "done".to_owned()),
        ]);
        assert_eq!(sink.of(Level::Warning), vec!["no primary key".to_owned()]);
    }

    #[test]
    fn tracing_sink_accepts_every_level() {
        let sink = TracingSink;
        sink.info("info");
        sink.warning("warning");
        sink.success("success");
    }
}
