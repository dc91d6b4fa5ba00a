//! The live try-on loop.
//!
//! Everything runs on one task: frame sampling, socket events, overlay
//! refreshes and status updates are multiplexed with `tokio::select!`, so no
//! two of them ever run at the same time.

use std::future::pending;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::render::{OverlayRenderer, RasterSurface, RenderOutcome};
use crate::sampler::{FrameSampler, VideoSource};
use crate::snapshot;
use crate::state::AppState;
use crate::status::{Indicator, StatusBoard, StatusReceiver};
use crate::transport::{spawn_link, FrameTransport, TransportEvent};
use crate::Result;

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub frames_sent: u64,
    pub renders: u64,
    pub reconnects: u32,
    pub status: StatusBoard,
    pub last_render: Option<RenderOutcome>,
    pub snapshot: Option<PathBuf>,
}

pub struct TryOnSession {
    config: AppConfig,
    app: AppState,
    status_rx: StatusReceiver,
    source: Box<dyn VideoSource>,
    cancel: CancellationToken,
    snapshot: Option<PathBuf>,
}

impl TryOnSession {
    pub fn new(config: AppConfig, source: Box<dyn VideoSource>) -> Self {
        let (app, status_rx) = AppState::new(config.accessories.clone());
        Self {
            config,
            app,
            status_rx,
            source,
            cancel: CancellationToken::new(),
            snapshot: None,
        }
    }

    /// Writes a composed PNG to `path` when the session ends.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Shared state, for controls that edit accessories or overrides while
    /// the session runs.
    pub fn app(&self) -> &AppState {
        &self.app
    }

    /// Cancelling this token ends [`Self::run`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(mut self) -> Result<SessionReport> {
        for (slot, path) in self.config.overrides.entries() {
            if let Err(err) = self.app.overrides.load_file(slot, path).await {
                tracing::warn!(?slot, path = %path.display(), "could not load override: {err}");
            }
        }

        let endpoint = self.config.transport.endpoint();
        let link = spawn_link(endpoint.clone());
        let mut events = link.events;
        let mut transport = FrameTransport::new(
            &self.app,
            link.outbound,
            self.config.transport.reconnect.clone(),
        );

        let mut sampler = FrameSampler::new(&self.config.sampler);
        let renderer = OverlayRenderer::new(&self.app);
        let mut overlay = RasterSurface::new(0, 0);
        let mut board = StatusBoard::new();

        let mut sample_tick = interval(sampler.interval());
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render_tick = interval(self.config.render.refresh_interval());
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut reconnect_at: Option<Pin<Box<Sleep>>> = None;
        let mut camera_ready = false;
        let mut renders = 0u64;
        let mut reconnects = 0u32;
        let mut last_render = None;

        tracing::info!(%endpoint, "try-on session started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sample_tick.tick() => {
                    let now = Instant::now().into_std();
                    let outcome = sampler.tick(now, self.source.as_mut(), &mut transport);
                    tracing::trace!(?outcome, "sampler tick");
                }
                Some(event) = events.recv() => {
                    let state = transport.handle_event(event);
                    if state.is_terminal() && reconnect_at.is_none() {
                        if let Some(delay) = transport.reconnect_delay() {
                            tracing::info!(?delay, "scheduling reconnect");
                            reconnect_at = Some(Box::pin(sleep(delay)));
                        }
                    }
                }
                _ = wait_for(&mut reconnect_at) => {
                    reconnect_at = None;
                    reconnects += 1;
                    let link = spawn_link(endpoint.clone());
                    // drain whatever the old link still had queued
                    drain_stale(&mut events);
                    events = link.events;
                    transport.reconnect(link.outbound);
                }
                _ = render_tick.tick() => {
                    if let Some((width, height)) = self.source.dimensions() {
                        if !camera_ready {
                            camera_ready = true;
                            self.app.status.ok(Indicator::Camera, "Camera: ready");
                        }
                        overlay.fit(width, height);
                    }
                    let outcome = renderer.tick(&mut overlay);
                    renders += 1;
                    last_render = Some(outcome);
                }
                Some(update) = self.status_rx.recv() => board.apply(update),
            }
        }

        transport.close();
        while let Ok(update) = self.status_rx.try_recv() {
            board.apply(update);
        }

        let snapshot = match self.snapshot.take() {
            Some(path) => self.write_snapshot(&overlay, path)?,
            None => None,
        };

        tracing::info!(
            frames_sent = transport.frames_sent(),
            renders,
            "try-on session finished: {}",
            board.summary()
        );
        Ok(SessionReport {
            frames_sent: transport.frames_sent(),
            renders,
            reconnects,
            status: board,
            last_render,
            snapshot,
        })
    }

    fn write_snapshot(&mut self, overlay: &RasterSurface, path: PathBuf) -> Result<Option<PathBuf>> {
        let Some(frame) = self.source.frame() else {
            tracing::warn!("no video frame available, skipping snapshot");
            return Ok(None);
        };
        let path = if path.is_dir() {
            path.join(snapshot::default_file_name(SystemTime::now()))
        } else {
            path
        };
        let composed = snapshot::compose(&frame, &overlay.to_image());
        snapshot::export_png(&composed, &path)?;
        Ok(Some(path))
    }
}

impl std::fmt::Debug for TryOnSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnSession")
            .field("config", &self.config)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

async fn wait_for(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.await,
        None => pending().await,
    }
}

fn drain_stale(events: &mut mpsc::UnboundedReceiver<TransportEvent>) {
    while let Ok(event) = events.try_recv() {
        tracing::debug!(?event, "dropping event from previous connection");
    }
}
