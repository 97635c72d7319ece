//! Viewer client: connection to the command stream plus the frame loop.
//!
//! The connection runs in its own task and hands every text message to the
//! frame loop over a channel. The frame loop keeps ticking while the
//! connection is down, so animations already in flight still finish.

use animus_core::{Dispatcher, MemoryScene, memory::SceneOp, wire};
use futures_util::StreamExt;
use std::{future::Future, time::Duration};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub url: String,
    pub fps: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5173/anim".to_string(),
            fps: 60,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Exponential reconnect delay: doubles on every failure up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Called after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Per-viewer pipeline state: a dispatcher over the in-memory scene.
pub struct Viewer {
    dispatcher: Dispatcher<MemoryScene>,
}

impl Viewer {
    pub fn new(scene: MemoryScene) -> Self {
        Self {
            dispatcher: Dispatcher::new(scene),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<MemoryScene> {
        &self.dispatcher
    }

    /// Decodes one pushed message and dispatches its commands in order.
    pub fn handle_message(&mut self, text: &str) {
        match wire::decode_commands(text) {
            Ok(commands) => {
                debug!(count = commands.len(), "Dispatching command batch");
                self.dispatcher.dispatch_all(commands);
            }
            Err(e) => warn!(error = %e, "Ignoring undecodable message"),
        }
    }

    /// Renders one frame at scene time `now` and returns the scene
    /// operations it produced.
    pub fn tick(&mut self, now: Duration) -> Vec<SceneOp> {
        // Advance first so commands flushed by a load apply at `now`.
        self.dispatcher.advance(now);
        let loaded = self.dispatcher.scene_mut().drain_loaded(now);
        for target in loaded {
            self.dispatcher.on_asset_ready(&target);
        }
        self.dispatcher.scene_mut().take_ops()
    }
}

/// Totals reported when the viewer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerStats {
    pub frames: u64,
    pub messages: u64,
    pub scene_ops: u64,
}

/// Runs the viewer until `shutdown` resolves.
pub async fn run<F>(options: ViewerOptions, scene: MemoryScene, shutdown: F) -> ViewerStats
where
    F: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let connection = tokio::spawn(connection_loop(
        options.url.clone(),
        Backoff::new(options.initial_backoff, options.max_backoff),
        tx,
    ));

    let mut viewer = Viewer::new(scene);
    let mut stats = ViewerStats::default();
    let mut frames = tokio::time::interval(Duration::from_secs(1) / options.fps.max(1));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = frames.tick() => {
                stats.frames += 1;
                stats.scene_ops += viewer.tick(started.elapsed()).len() as u64;
            },
            Some(text) = rx.recv() => {
                stats.messages += 1;
                viewer.handle_message(&text);
            },
        }
    }

    connection.abort();
    info!(
        frames = stats.frames,
        messages = stats.messages,
        scene_ops = stats.scene_ops,
        "Viewer stopped"
    );
    stats
}

#[instrument(skip(backoff, tx))]
async fn connection_loop(url: String, mut backoff: Backoff, tx: mpsc::Sender<String>) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to command stream");
                backoff.reset();
                if !pump(stream, &tx).await {
                    return;
                }
                warn!("Command stream disconnected");
            }
            Err(e) => warn!(error = %e, "Failed to connect to command stream"),
        }

        let delay = backoff.next_delay();
        info!(delay_ms = delay.as_millis() as u64, "Reconnecting after backoff");
        tokio::time::sleep(delay).await;
    }
}

/// Forwards text messages until the stream ends. Returns `false` once the
/// frame loop has gone away.
async fn pump(mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>, tx: &mpsc::Sender<String>) -> bool {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if tx.send(text.as_str().to_owned()).await.is_err() {
                    return false;
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Server closed the command stream");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Command stream error");
                break;
            }
        }
    }
    true
}
