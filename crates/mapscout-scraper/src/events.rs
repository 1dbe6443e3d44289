//! Worker → observer progress channel.

use std::path::PathBuf;

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Log { level: LogLevel, message: String },
    Status(String),
    ReviewProgress {
        place: String,
        current: usize,
        target: usize,
    },
    Finished { output: Option<PathBuf> },
}

/// Fire-and-forget sender of [`RunEvent`]s.
///
/// Every log line is mirrored to `tracing` at the same level, so a run is
/// still observable when nobody holds the receiver.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl Reporter {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that only writes to `tracing`.
    #[must_use]
    pub fn detached() -> Self {
        Self { tx: None }
    }

    fn send(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means nobody is watching
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(target: "mapscout::run", "{message}"),
            LogLevel::Info => tracing::info!(target: "mapscout::run", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "mapscout::run", "{message}"),
            LogLevel::Error => tracing::error!(target: "mapscout::run", "{message}"),
        }
        self.send(RunEvent::Log { level, message });
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn status(&self, status: impl Into<String>) {
        self.send(RunEvent::Status(status.into()));
    }

    pub fn progress(&self, place: &str, current: usize, target: usize) {
        tracing::debug!(place, current, target, "review progress");
        self.send(RunEvent::ReviewProgress {
            place: place.to_string(),
            current,
            target,
        });
    }

    pub fn finished(&self, output: Option<PathBuf>) {
        self.send(RunEvent::Finished { output });
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order() {
        let (reporter, mut rx) = Reporter::channel();
        reporter.status("Running");
        reporter.warn("no reviews tab");
        reporter.progress("Кофейня", 0, 3);
        reporter.finished(None);

        assert_eq!(
            drain(&mut rx),
            vec![
                RunEvent::Status("Running".to_string()),
                RunEvent::Log {
                    level: LogLevel::Warn,
                    message: "no reviews tab".to_string(),
                },
                RunEvent::ReviewProgress {
                    place: "Кофейня".to_string(),
                    current: 0,
                    target: 3,
                },
                RunEvent::Finished { output: None },
            ]
        );
    }

    #[test]
    fn send_after_receiver_dropped_is_ignored() {
        let (reporter, rx) = Reporter::channel();
        drop(rx);
        reporter.info("still fine");
        reporter.finished(None);
    }

    #[test]
    fn detached_reporter_accepts_events() {
        let reporter = Reporter::detached();
        reporter.error("logged only");
        reporter.progress("x", 1, 2);
    }
}
