//! Fanout of command batches to connected viewers.
//!
//! The viewer set is owned by a single actor task. Joins, leaves, publishes
//! and count queries reach it over one control channel, so the set is never
//! shared or locked. Each viewer drains its own bounded buffer; the actor
//! only ever `try_send`s into it, which keeps a slow viewer from holding up
//! the others.

use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub type ViewerId = Uuid;

/// Outcome of one publish across all viewers connected at that moment.
#[derive(Serialize, ToSchema, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("The fanout task is no longer running")]
    Stopped,
}

enum Control {
    Join {
        id: ViewerId,
        tx: mpsc::Sender<Arc<str>>,
    },
    Leave {
        id: ViewerId,
    },
    Publish {
        payload: Arc<str>,
        reply: oneshot::Sender<PublishReport>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the fanout actor. Cheap to clone.
#[derive(Clone)]
pub struct Fanout {
    control: mpsc::UnboundedSender<Control>,
    buffer: usize,
}

impl Fanout {
    /// Spawns the actor on the current runtime. `buffer` is the number of
    /// batches a viewer may have outstanding before it starts missing them.
    pub fn spawn(buffer: usize) -> Self {
        let (control, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self {
            control,
            buffer: buffer.max(1),
        }
    }

    /// Registers a new viewer. It receives every batch published after this
    /// call returns.
    pub fn join(&self) -> Result<ViewerSubscription, FanoutError> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.control
            .send(Control::Join { id, tx })
            .map_err(|_| FanoutError::Stopped)?;
        Ok(ViewerSubscription {
            id,
            rx,
            control: self.control.clone(),
        })
    }

    /// Sends `payload` to every connected viewer without waiting on any of
    /// them.
    pub async fn publish(&self, payload: impl Into<Arc<str>>) -> Result<PublishReport, FanoutError> {
        let (reply, report) = oneshot::channel();
        self.control
            .send(Control::Publish {
                payload: payload.into(),
                reply,
            })
            .map_err(|_| FanoutError::Stopped)?;
        report.await.map_err(|_| FanoutError::Stopped)
    }

    pub async fn viewer_count(&self) -> Result<usize, FanoutError> {
        let (reply, count) = oneshot::channel();
        self.control
            .send(Control::Count { reply })
            .map_err(|_| FanoutError::Stopped)?;
        count.await.map_err(|_| FanoutError::Stopped)
    }
}

/// A viewer's end of the fanout. Dropping it removes the viewer.
pub struct ViewerSubscription {
    id: ViewerId,
    rx: mpsc::Receiver<Arc<str>>,
    control: mpsc::UnboundedSender<Control>,
}

impl ViewerSubscription {
    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Next batch for this viewer, in publish order.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }
}

impl Drop for ViewerSubscription {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Leave { id: self.id });
    }
}

async fn run(mut control: mpsc::UnboundedReceiver<Control>) {
    let mut viewers: HashMap<ViewerId, mpsc::Sender<Arc<str>>> = HashMap::new();

    while let Some(msg) = control.recv().await {
        match msg {
            Control::Join { id, tx } => {
                viewers.insert(id, tx);
                info!(viewer_id = %id, viewers = viewers.len(), "Viewer joined");
            }
            Control::Leave { id } => {
                if viewers.remove(&id).is_some() {
                    info!(viewer_id = %id, viewers = viewers.len(), "Viewer left");
                }
            }
            Control::Publish { payload, reply } => {
                let report = broadcast(&mut viewers, &payload);
                let _ = reply.send(report);
            }
            Control::Count { reply } => {
                let _ = reply.send(viewers.len());
            }
        }
    }
    debug!("Fanout control channel closed");
}

fn broadcast(
    viewers: &mut HashMap<ViewerId, mpsc::Sender<Arc<str>>>,
    payload: &Arc<str>,
) -> PublishReport {
    let mut report = PublishReport::default();
    let mut dead_viewers = Vec::new();

    for (id, tx) in viewers.iter() {
        match tx.try_send(payload.clone()) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!(viewer_id = %id, "Viewer buffer full, batch dropped for this viewer");
                report.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => {
                warn!(viewer_id = %id, "Viewer channel closed, removing viewer");
                report.dropped += 1;
                dead_viewers.push(*id);
            }
        }
    }

    for id in dead_viewers {
        viewers.remove(&id);
    }
    report
}
