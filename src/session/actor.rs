//! Session task: serializes scanner batches and user actions.
//!
//! The task owns the [`Session`]; everything else talks to it through a
//! cloneable [`SessionHandle`]. Inputs are handled strictly in arrival
//! order, one flow at a time.

use super::{Session, SessionState};
use crate::camera::capture::StillCamera;
use crate::camera::scanner::{CodeSource, DetectionEvent};
use crate::defaults;
use crate::error::{Result, ShopAssistError};
use crate::ocr::join_blocks;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Messages accepted by the session task.
pub enum SessionInput {
    /// One frame's worth of detections from the scanner.
    Codes(Vec<DetectionEvent>),
    /// "Scan Barcode".
    Rescan(oneshot::Sender<()>),
    /// "Recognize Text"; replies with the displayed text.
    Recognize(oneshot::Sender<Result<String>>),
    BindCamera(Option<Arc<dyn StillCamera>>, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<(SessionState, bool)>),
    Shutdown,
}

/// Cloneable front door to a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionInput>,
}

/// Start the session task.
///
/// The task ends on [`SessionHandle::shutdown`] or once every handle is
/// dropped, and hands the session back.
pub fn spawn_session(session: Session) -> (SessionHandle, JoinHandle<Session>) {
    let (tx, rx) = mpsc::channel(defaults::DETECTION_QUEUE);
    let task = tokio::spawn(run(session, rx));
    (SessionHandle { tx }, task)
}

async fn run(mut session: Session, mut rx: mpsc::Receiver<SessionInput>) -> Session {
    while let Some(input) = rx.recv().await {
        match input {
            SessionInput::Codes(codes) => {
                session.on_codes_scanned(&codes).await;
            }
            SessionInput::Rescan(reply) => {
                session.rescan();
                reply.send(()).ok();
            }
            SessionInput::Recognize(reply) => {
                let outcome = session.recognize_text().await.map(|result| {
                    join_blocks(&result.blocks)
                        .unwrap_or_else(|| defaults::NO_TEXT_DETECTED.to_string())
                });
                reply.send(outcome).ok();
            }
            SessionInput::BindCamera(camera, reply) => {
                session.bind_camera(camera);
                reply.send(()).ok();
            }
            SessionInput::Snapshot(reply) => {
                reply
                    .send((session.state().clone(), session.has_camera()))
                    .ok();
            }
            SessionInput::Shutdown => break,
        }
    }
    tracing::debug!("session task finished");
    session
}

fn stopped() -> ShopAssistError {
    ShopAssistError::Other("session is not running".to_string())
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionInput) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await.map_err(|_| stopped())?;
        reply_rx.await.map_err(|_| stopped())
    }

    /// Queue a detection batch without waiting.
    ///
    /// Returns false when the batch was dropped because the session is busy
    /// or gone.
    pub fn submit_codes(&self, codes: Vec<DetectionEvent>) -> bool {
        match self.tx.try_send(SessionInput::Codes(codes)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("session busy; detection batch dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn rescan(&self) -> Result<()> {
        self.request(SessionInput::Rescan).await
    }

    pub async fn recognize(&self) -> Result<String> {
        self.request(SessionInput::Recognize).await?
    }

    pub async fn bind_camera(&self, camera: Option<Arc<dyn StillCamera>>) -> Result<()> {
        self.request(|reply| SessionInput::BindCamera(camera, reply))
            .await
    }

    /// Current state and whether a camera is bound.
    pub async fn snapshot(&self) -> Result<(SessionState, bool)> {
        self.request(SessionInput::Snapshot).await
    }

    pub async fn shutdown(&self) {
        self.tx.send(SessionInput::Shutdown).await.ok();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Feed batches from `source` into the session until it ends or the
    /// session stops.
    pub async fn pump_codes(&self, source: &mut dyn CodeSource) -> Result<()> {
        while let Some(batch) = source.next_codes().await? {
            if batch.is_empty() {
                continue;
            }
            if !self.submit_codes(batch) && self.is_closed() {
                break;
            }
        }
        Ok(())
    }

    /// Pump a code source into the session on a background task.
    pub fn forward_codes(&self, mut source: Box<dyn CodeSource>) -> JoinHandle<Result<()>> {
        let handle = self.clone();
        tokio::spawn(async move { handle.pump_codes(source.as_mut()).await })
    }
}
