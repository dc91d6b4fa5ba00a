use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Which indicator a status update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Camera,
    Socket,
    Face,
}

/// Tri-state level shown next to each indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Ok,
    Warn,
    Err,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub indicator: Indicator,
    pub level: StatusLevel,
    pub text: String,
}

impl StatusUpdate {
    pub fn new(indicator: Indicator, level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            indicator,
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.text)
    }
}

pub type StatusReceiver = mpsc::UnboundedReceiver<StatusUpdate>;

/// Sending half handed to every component that reports status.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusReporter {
    pub fn channel() -> (Self, StatusReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, indicator: Indicator, level: StatusLevel, text: &str) {
        match level {
            StatusLevel::Ok => tracing::info!(?indicator, "{text}"),
            StatusLevel::Warn => tracing::warn!(?indicator, "{text}"),
            StatusLevel::Err => tracing::error!(?indicator, "{text}"),
        }
        // Nobody listening is fine; the log line above still records it.
        let _ = self.tx.send(StatusUpdate::new(indicator, level, text));
    }

    pub fn ok(&self, indicator: Indicator, text: &str) {
        self.report(indicator, StatusLevel::Ok, text);
    }

    pub fn warn(&self, indicator: Indicator, text: &str) {
        self.report(indicator, StatusLevel::Warn, text);
    }

    pub fn err(&self, indicator: Indicator, text: &str) {
        self.report(indicator, StatusLevel::Err, text);
    }
}

/// Latest update per indicator, as a status bar would show it.
#[derive(Debug, Default, Clone)]
pub struct StatusBoard {
    latest: HashMap<Indicator, StatusUpdate>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: StatusUpdate) {
        self.latest.insert(update.indicator, update);
    }

    pub fn get(&self, indicator: Indicator) -> Option<&StatusUpdate> {
        self.latest.get(&indicator)
    }

    /// One line per known indicator in camera, socket, face order.
    pub fn summary(&self) -> String {
        [Indicator::Camera, Indicator::Socket, Indicator::Face]
            .iter()
            .filter_map(|indicator| self.get(*indicator))
            .map(|update| update.to_string())
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_delivers_updates_in_order() {
        let (reporter, mut rx) = StatusReporter::channel();
        reporter.ok(Indicator::Socket, "WS: connected");
        reporter.warn(Indicator::Face, "Face: not found");

        assert_eq!(
            rx.try_recv().unwrap(),
            StatusUpdate::new(Indicator::Socket, StatusLevel::Ok, "WS: connected")
        );
        assert_eq!(rx.try_recv().unwrap().level, StatusLevel::Warn);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn board_keeps_latest_per_indicator() {
        let mut board = StatusBoard::new();
        board.apply(StatusUpdate::new(Indicator::Face, StatusLevel::Warn, "Face: not found"));
        board.apply(StatusUpdate::new(Indicator::Face, StatusLevel::Ok, "Face: detected"));
        board.apply(StatusUpdate::new(Indicator::Camera, StatusLevel::Ok, "Camera: ready"));

        assert_eq!(board.get(Indicator::Face).unwrap().text, "Face: detected");
        assert_eq!(board.summary(), "[Ok] Camera: ready  [Ok] Face: detected");
    }

    #[test]
    fn reporting_without_listener_does_not_fail() {
        let (reporter, rx) = StatusReporter::channel();
        drop(rx);
        reporter.err(Indicator::Camera, "Camera: unavailable");
    }
}
