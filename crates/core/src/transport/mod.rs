//! Connection to the detection service.
//!
//! [`FrameTransport`] is the state machine; it never touches the network
//! itself. Socket I/O lives in [`socket`], which reports [`TransportEvent`]s
//! and drains an outbound queue. Keeping the two apart lets the session feed
//! events one at a time from its select loop, and lets tests drive the state
//! machine with hand-written events.

pub mod socket;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::landmarks::LandmarkSlot;
use crate::protocol::{InboundMessage, OutboundFrame};
use crate::state::AppState;
use crate::status::{Indicator, StatusReporter};

pub use socket::{spawn_link, TransportLink};

/// Queue of serialized outbound messages consumed by the socket task.
pub type OutboundSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    /// Closed and Errored end the current connection instance.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

/// What the socket task observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Failed(String),
}

/// What to do once a connection has ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Leave the connection dead.
    #[default]
    Never,
    /// Retry with exponential backoff, starting at `initial_ms` and doubling
    /// up to `max_ms`. `max_attempts` of `None` retries forever.
    Backoff {
        initial_ms: u64,
        max_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (zero-based), or
    /// `None` when no further attempt should be made.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Backoff {
                initial_ms,
                max_ms,
                max_attempts,
            } => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return None;
                }
                let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
                let millis = initial_ms.saturating_mul(factor).min(max_ms.max(initial_ms));
                Some(Duration::from_millis(millis))
            }
        }
    }
}

/// Client side of one logical connection to the detection service.
#[derive(Debug)]
pub struct FrameTransport {
    state: ConnectionState,
    outbound: Option<OutboundSender>,
    landmarks: LandmarkSlot,
    status: StatusReporter,
    policy: ReconnectPolicy,
    attempts: u32,
    shut_down: bool,
    face_found: Option<bool>,
    frames_sent: u64,
}

impl FrameTransport {
    pub fn new(app: &AppState, outbound: OutboundSender, policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Connecting,
            outbound: Some(outbound),
            landmarks: app.landmarks.clone(),
            status: app.status.clone(),
            policy,
            attempts: 0,
            shut_down: false,
            face_found: None,
            frames_sent: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Queues a frame for the service. Returns `false` when the frame was
    /// dropped because the connection is not open.
    pub fn send_frame(&mut self, frame: &OutboundFrame) -> bool {
        if !self.is_open() {
            tracing::debug!(state = ?self.state, "dropping frame, transport not open");
            return false;
        }
        let Some(outbound) = &self.outbound else {
            return false;
        };
        let payload = match frame.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("failed to serialize outbound frame: {err}");
                return false;
            }
        };
        if outbound.send(payload).is_err() {
            tracing::debug!("socket task gone, dropping frame");
            return false;
        }
        self.frames_sent += 1;
        true
    }

    /// Applies one socket event and returns the resulting state.
    pub fn handle_event(&mut self, event: TransportEvent) -> ConnectionState {
        if self.state.is_terminal() {
            tracing::debug!(?event, "ignoring event for finished connection");
            return self.state;
        }

        match (self.state, event) {
            (ConnectionState::Connecting, TransportEvent::Opened) => {
                self.state = ConnectionState::Open;
                self.attempts = 0;
                self.status.ok(Indicator::Socket, "WS: connected");
            }
            (ConnectionState::Open, TransportEvent::Message(text)) => self.route(&text),
            (ConnectionState::Connecting, TransportEvent::Message(_)) => {
                tracing::debug!("message before handshake completed, ignoring");
            }
            (_, TransportEvent::Closed) => {
                self.state = ConnectionState::Closed;
                self.outbound = None;
                self.status.warn(Indicator::Socket, "WS: closed");
            }
            (_, TransportEvent::Failed(reason)) => {
                tracing::error!("detection service connection failed: {reason}");
                self.state = ConnectionState::Errored;
                self.outbound = None;
                self.status.err(Indicator::Socket, "WS: error");
            }
            (ConnectionState::Open, TransportEvent::Opened) => {
                tracing::debug!("duplicate open event");
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "unexpected transport event");
            }
        }
        self.state
    }

    fn route(&mut self, text: &str) {
        match InboundMessage::parse(text) {
            InboundMessage::Error(message) => {
                tracing::warn!("detection service error: {message}");
            }
            InboundMessage::Absent => {
                self.landmarks.clear();
                self.set_face_found(false);
            }
            InboundMessage::Face(landmarks) => {
                self.landmarks.replace(landmarks);
                self.set_face_found(true);
            }
            InboundMessage::Malformed(reason) => {
                tracing::warn!("ignoring malformed detection message: {reason}");
            }
        }
    }

    fn set_face_found(&mut self, found: bool) {
        if self.face_found == Some(found) {
            return;
        }
        self.face_found = Some(found);
        if found {
            self.status.ok(Indicator::Face, "Face: detected");
        } else {
            self.status.warn(Indicator::Face, "Face: not found");
        }
    }

    /// Ends the connection from our side. No reconnect follows.
    pub fn close(&mut self) {
        self.shut_down = true;
        if self.state.is_terminal() {
            return;
        }
        self.state = ConnectionState::Closed;
        self.outbound = None;
        self.status.warn(Indicator::Socket, "WS: closed");
    }

    /// How long to wait before reconnecting, if the connection has ended and
    /// the policy allows another attempt.
    pub fn reconnect_delay(&self) -> Option<Duration> {
        if self.shut_down || !self.state.is_terminal() {
            return None;
        }
        self.policy.delay(self.attempts)
    }

    /// Starts a fresh connection instance on a new outbound queue.
    pub fn reconnect(&mut self, outbound: OutboundSender) {
        self.attempts = self.attempts.saturating_add(1);
        self.state = ConnectionState::Connecting;
        self.outbound = Some(outbound);
        self.status.warn(Indicator::Socket, "WS: reconnecting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::landmarks::Landmarks;
    use crate::status::{StatusLevel, StatusReceiver, StatusUpdate};

    const FACE: &str = r#"{"face":true,"faceW":100,"chin":{"x":50,"y":80},"leftEar":{"x":10,"y":40},"rightEar":{"x":90,"y":40},"nose":{"x":50,"y":55}}"#;

    fn setup() -> (
        FrameTransport,
        AppState,
        StatusReceiver,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (app, status_rx) = AppState::new(Default::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = FrameTransport::new(&app, tx, ReconnectPolicy::Never);
        (transport, app, status_rx, rx)
    }

    fn drain(rx: &mut StatusReceiver) -> Vec<(StatusLevel, String)> {
        let mut seen = Vec::new();
        while let Ok(StatusUpdate { level, text, .. }) = rx.try_recv() {
            seen.push((level, text));
        }
        seen
    }

    #[test]
    fn lifecycle_reports_expected_status_sequence() {
        let (mut transport, app, mut status_rx, _out) = setup();
        assert_eq!(transport.state(), ConnectionState::Connecting);

        transport.handle_event(TransportEvent::Opened);
        transport.handle_event(TransportEvent::Message(r#"{"face":false}"#.to_string()));
        assert!(app.landmarks.current().is_none());
        transport.handle_event(TransportEvent::Message(FACE.to_string()));
        assert_eq!(app.landmarks.current().unwrap().face_width, 100.0);
        transport.handle_event(TransportEvent::Closed);

        assert_eq!(
            drain(&mut status_rx),
            vec![
                (StatusLevel::Ok, "WS: connected".to_string()),
                (StatusLevel::Warn, "Face: not found".to_string()),
                (StatusLevel::Ok, "Face: detected".to_string()),
                (StatusLevel::Warn, "WS: closed".to_string()),
            ]
        );
        assert_eq!(transport.state(), ConnectionState::Closed);
    }

    #[test]
    fn malformed_and_error_messages_keep_current_landmarks() {
        let (mut transport, app, _status, _out) = setup();
        transport.handle_event(TransportEvent::Opened);
        transport.handle_event(TransportEvent::Message(FACE.to_string()));
        let before = app.landmarks.current();

        transport.handle_event(TransportEvent::Message(r#"{"unexpected":1}"#.to_string()));
        transport.handle_event(TransportEvent::Message("{{{".to_string()));
        transport.handle_event(TransportEvent::Message(r#"{"error":"no_image"}"#.to_string()));

        assert_eq!(app.landmarks.current(), before);
        assert_eq!(transport.state(), ConnectionState::Open);
    }

    #[test]
    fn face_status_only_changes_on_transitions() {
        let (mut transport, _app, mut status_rx, _out) = setup();
        transport.handle_event(TransportEvent::Opened);
        for _ in 0..3 {
            transport.handle_event(TransportEvent::Message(FACE.to_string()));
        }
        assert_eq!(drain(&mut status_rx).len(), 2);
    }

    #[test]
    fn sends_only_while_open() {
        let (mut transport, _app, _status, mut out) = setup();
        let frame = OutboundFrame {
            image: "AAAA".to_string(),
        };

        assert!(!transport.send_frame(&frame));
        transport.handle_event(TransportEvent::Opened);
        assert!(transport.send_frame(&frame));
        assert_eq!(out.try_recv().unwrap(), r#"{"image":"AAAA"}"#);

        transport.handle_event(TransportEvent::Failed("reset by peer".to_string()));
        assert_eq!(transport.state(), ConnectionState::Errored);
        assert!(!transport.send_frame(&frame));
        assert_eq!(transport.frames_sent(), 1);
    }

    #[test]
    fn terminal_states_ignore_late_events() {
        let (mut transport, app, _status, _out) = setup();
        transport.handle_event(TransportEvent::Failed("refused".to_string()));
        assert_eq!(transport.state(), ConnectionState::Errored);

        transport.handle_event(TransportEvent::Opened);
        transport.handle_event(TransportEvent::Message(FACE.to_string()));
        assert_eq!(transport.state(), ConnectionState::Errored);
        assert!(app.landmarks.current().is_none());
    }

    #[test]
    fn stale_landmarks_survive_a_closed_connection() {
        let (mut transport, app, _status, _out) = setup();
        transport.handle_event(TransportEvent::Opened);
        transport.handle_event(TransportEvent::Message(FACE.to_string()));
        transport.handle_event(TransportEvent::Closed);

        let expected = Landmarks::new(
            100.0,
            Point::new(50.0, 80.0),
            Point::new(10.0, 40.0),
            Point::new(90.0, 40.0),
            Point::new(50.0, 55.0),
        );
        assert_eq!(app.landmarks.current().as_deref(), Some(&expected));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::Backoff {
            initial_ms: 250,
            max_ms: 1_000,
            max_attempts: Some(4),
        };
        let delays: Vec<_> = (0..5).map(|attempt| policy.delay(attempt)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_millis(250)),
                Some(Duration::from_millis(500)),
                Some(Duration::from_millis(1_000)),
                Some(Duration::from_millis(1_000)),
                None,
            ]
        );
        assert_eq!(ReconnectPolicy::Never.delay(0), None);
    }

    #[test]
    fn reconnect_follows_policy_until_closed_by_us() {
        let (app, mut status_rx) = AppState::new(Default::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::Backoff {
            initial_ms: 100,
            max_ms: 400,
            max_attempts: None,
        };
        let mut transport = FrameTransport::new(&app, tx, policy);

        assert_eq!(transport.reconnect_delay(), None);
        transport.handle_event(TransportEvent::Failed("refused".to_string()));
        assert_eq!(transport.reconnect_delay(), Some(Duration::from_millis(100)));

        let (tx, _rx2) = mpsc::unbounded_channel();
        transport.reconnect(tx);
        assert_eq!(transport.state(), ConnectionState::Connecting);
        transport.handle_event(TransportEvent::Failed("refused".to_string()));
        assert_eq!(transport.reconnect_delay(), Some(Duration::from_millis(200)));

        let (tx, _rx3) = mpsc::unbounded_channel();
        transport.reconnect(tx);
        transport.handle_event(TransportEvent::Opened);
        transport.close();
        assert_eq!(transport.reconnect_delay(), None);

        let texts: Vec<String> = drain(&mut status_rx).into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            texts,
            vec![
                "WS: error",
                "WS: reconnecting",
                "WS: error",
                "WS: reconnecting",
                "WS: connected",
                "WS: closed",
            ]
        );
    }
}
