//! Camera lifecycle behind the permission gate.
//!
//! Nothing camera-backed runs until the gate says granted. Once it does, the
//! detection stream is pumped into the session and a still camera is bound.
//! Most V4L2 drivers allow one streaming reader, so the bound camera stops
//! the detection stream for the length of each photo and restarts it after.

use super::capture::{FfmpegCamera, StillCamera};
use super::permission::{CameraAccess, DevicePermission, PermissionGate, ensure_access};
use super::scanner::{CodeSource, ZbarScanner, symbologies_from_config};
use crate::config::CameraConfig;
use crate::error::Result;
use crate::exec::SystemCommandExecutor;
use crate::session::SessionHandle;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// Opens a fresh detection stream.
pub type ScannerFactory = Box<dyn Fn() -> Result<Box<dyn CodeSource>> + Send + Sync>;

/// A detection stream being pumped into a session.
struct ScannerRun {
    session: SessionHandle,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl ScannerRun {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop pumping and wait until the source has released the device.
    async fn halt(self) -> SessionHandle {
        self.stop.send(()).ok();
        match self.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "barcode scanner ended with error"),
            Err(e) => tracing::warn!(error = %e, "barcode scanner task failed"),
        }
        self.session
    }
}

/// The single detection stream of a controller.
struct ScannerSlot {
    open: ScannerFactory,
    run: Mutex<Option<ScannerRun>>,
}

impl ScannerSlot {
    fn launch(&self, session: SessionHandle) -> Result<ScannerRun> {
        let mut source = (self.open)()?;
        let (stop, mut stopped) = oneshot::channel();
        let pump = session.clone();
        let task = tokio::spawn(async move {
            let result = tokio::select! {
                result = pump.pump_codes(source.as_mut()) => result,
                _ = &mut stopped => Ok(()),
            };
            source.close().await?;
            result
        });
        Ok(ScannerRun {
            session,
            stop,
            task,
        })
    }

    async fn is_running(&self) -> bool {
        self.run.lock().await.as_ref().is_some_and(ScannerRun::is_running)
    }

    async fn ensure_running(&self, session: &SessionHandle, device: &str) {
        let mut run = self.run.lock().await;
        if run.as_ref().is_some_and(ScannerRun::is_running) {
            return;
        }
        match self.launch(session.clone()) {
            Ok(started) => {
                tracing::info!(device, "barcode scanner started");
                *run = Some(started);
            }
            Err(e) => tracing::error!(error = %e, "could not start barcode scanner"),
        }
    }

    async fn stop(&self) {
        if let Some(run) = self.run.lock().await.take() {
            run.halt().await;
            tracing::debug!("barcode scanner stopped");
        }
    }
}

/// Still camera that has the device to itself while it takes a photo.
struct ExclusiveCamera {
    inner: Arc<dyn StillCamera>,
    scanner: Arc<ScannerSlot>,
}

#[async_trait]
impl StillCamera for ExclusiveCamera {
    async fn take_photo(&self) -> Result<PathBuf> {
        let mut run = self.scanner.run.lock().await;
        let paused = match run.take() {
            Some(active) if active.is_running() => Some(active.halt().await),
            _ => None,
        };

        let photo = self.inner.take_photo().await;

        if let Some(session) = paused {
            match self.scanner.launch(session) {
                Ok(resumed) => *run = Some(resumed),
                Err(e) => tracing::error!(error = %e, "could not resume barcode scanner"),
            }
        }
        photo
    }
}

pub struct CameraController {
    gate: Arc<dyn PermissionGate>,
    scanner: Arc<ScannerSlot>,
    camera: Arc<dyn StillCamera>,
    access: Mutex<CameraAccess>,
}

impl CameraController {
    pub fn new(
        gate: Arc<dyn PermissionGate>,
        open_scanner: ScannerFactory,
        camera: Arc<dyn StillCamera>,
    ) -> Self {
        let scanner = Arc::new(ScannerSlot {
            open: open_scanner,
            run: Mutex::new(None),
        });
        let camera: Arc<dyn StillCamera> = Arc::new(ExclusiveCamera {
            inner: camera,
            scanner: Arc::clone(&scanner),
        });
        Self {
            gate,
            scanner,
            camera,
            access: Mutex::new(CameraAccess::Unavailable),
        }
    }

    /// Controller for the configured V4L2 device using zbarcam and ffmpeg.
    pub fn system(config: &CameraConfig) -> Self {
        let device = config.device.clone();
        let symbologies = symbologies_from_config(&config.symbologies);
        let open_scanner: ScannerFactory = Box::new(move || {
            ZbarScanner::spawn(&device, symbologies.clone())
                .map(|scanner| Box::new(scanner) as Box<dyn CodeSource>)
        });
        let camera = FfmpegCamera::new(
            SystemCommandExecutor::new(),
            config.device.clone(),
            config.capture_dir(),
        );
        Self::new(
            Arc::new(DevicePermission::new(&config.device)),
            open_scanner,
            Arc::new(camera),
        )
    }

    pub fn device(&self) -> &str {
        self.gate.device()
    }

    /// Last access decision.
    pub async fn access(&self) -> CameraAccess {
        *self.access.lock().await
    }

    pub async fn scanner_running(&self) -> bool {
        self.scanner.is_running().await
    }

    /// Startup gate: check, request once if needed, then activate.
    pub async fn start(&self, session: &SessionHandle) -> Result<CameraAccess> {
        let access = ensure_access(self.gate.as_ref());
        self.apply(access, session).await
    }

    /// The "Grant Permission" action.
    pub async fn retry(&self, session: &SessionHandle) -> Result<CameraAccess> {
        let access = self.gate.request();
        self.apply(access, session).await
    }

    async fn apply(&self, access: CameraAccess, session: &SessionHandle) -> Result<CameraAccess> {
        *self.access.lock().await = access;

        if !access.is_granted() {
            self.stop().await;
            session.bind_camera(None).await?;
            return Ok(access);
        }

        self.scanner.ensure_running(session, self.device()).await;
        session.bind_camera(Some(Arc::clone(&self.camera))).await?;
        Ok(access)
    }

    /// Stop the detection stream.
    pub async fn stop(&self) {
        self.scanner.stop().await;
    }
}
