//! Command handler implementation for the daemon.

use crate::camera::CameraController;
use crate::defaults;
use crate::error::Result;
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use crate::session::SessionHandle;
use std::sync::Arc;
use tokio::sync::Notify;

/// Command handler for daemon IPC commands.
pub struct DaemonCommandHandler {
    session: SessionHandle,
    camera: Arc<CameraController>,
    shutdown: Arc<Notify>,
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error {
        message: e.to_string(),
    }
}

impl DaemonCommandHandler {
    pub fn new(session: SessionHandle, camera: Arc<CameraController>, shutdown: Arc<Notify>) -> Self {
        Self {
            session,
            camera,
            shutdown,
        }
    }

    async fn require_camera(&self) -> Result<()> {
        self.camera.access().await.require(self.camera.device())
    }

    async fn scan(&self) -> Response {
        if let Err(e) = self.require_camera().await {
            return error_response(e);
        }
        match self.session.rescan().await {
            Ok(()) => Response::Ok,
            Err(e) => error_response(e),
        }
    }

    async fn recognize(&self) -> Response {
        if let Err(e) = self.require_camera().await {
            return error_response(e);
        }
        match self.session.recognize().await {
            Ok(text) => Response::Recognized { text },
            Err(e) => {
                tracing::debug!(error = %e, "recognize over IPC failed");
                Response::Error {
                    message: defaults::OCR_ALERT_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn grant(&self) -> Response {
        match self.camera.retry(&self.session).await {
            Ok(access) => match access.require(self.camera.device()) {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            },
            Err(e) => error_response(e),
        }
    }

    async fn status(&self) -> Response {
        let (state, _) = match self.session.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return error_response(e),
        };

        Response::Status {
            camera: self.camera.access().await,
            scanner_running: self.camera.scanner_running().await,
            scan_armed: !state.scanned,
            product_name: state.product_name,
            ocr_text: state.ocr_text,
            image_path: state.image_path.map(|p| p.display().to_string()),
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Scan => self.scan().await,
            Command::Recognize => self.recognize().await,
            Command::Grant => self.grant().await,
            Command::Status => self.status().await,
            Command::Shutdown => {
                self.shutdown.notify_one();
                Response::Ok
            }
        }
    }
}
