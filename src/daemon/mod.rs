//! Daemon mode: one long-lived session controlled over a Unix socket.

pub mod handler;

use crate::app::{build_session, install_announcer, spawn_renderer};
use crate::camera::CameraController;
use crate::config::Config;
use crate::error::{Result, ShopAssistError};
use crate::ipc::server::IpcServer;
use crate::session::spawn_session;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// Run the daemon: gate the camera, serve IPC, wait for shutdown.
///
/// With `verbosity >= 1` session updates are rendered to stdout as they
/// happen.
pub async fn run_daemon(config: Config, socket_path: Option<PathBuf>, verbosity: u8) -> Result<()> {
    install_announcer(&config.speech)?;

    let mut session = build_session(&config)?;
    let renderer = if verbosity >= 1 {
        let (tx, rx) = crossbeam_channel::unbounded();
        session = session.with_update_sender(tx);
        Some(spawn_renderer(rx)?)
    } else {
        None
    };

    let (handle, task) = spawn_session(session);
    let camera = Arc::new(CameraController::system(&config.camera));
    let access = camera.start(&handle).await?;
    tracing::info!(device = camera.device(), ?access, "camera gate");

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path));
    tracing::info!(socket = %server.socket_path().display(), "daemon ready");

    let shutdown = Arc::new(Notify::new());
    let handler =
        handler::DaemonCommandHandler::new(handle.clone(), Arc::clone(&camera), Arc::clone(&shutdown));

    let server_clone = Arc::clone(&server);
    let mut server_handle = tokio::spawn(async move { server_clone.start(handler).await });

    let early_exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
            None
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "signal handler failed");
            }
            tracing::info!("received SIGTERM, shutting down");
            None
        }
        _ = shutdown.notified() => {
            tracing::info!("shutdown requested over IPC");
            None
        }
        res = &mut server_handle => Some(res),
    };

    server.stop()?;
    let server_result = match early_exit {
        Some(res) => res,
        None => server_handle.await,
    };
    let server_result = match server_result {
        Ok(result) => result,
        Err(e) => Err(ShopAssistError::Other(format!("IPC server task failed: {e}"))),
    };

    camera.stop().await;
    handle.shutdown().await;
    drop(handle);
    if let Err(e) = task.await {
        tracing::error!(error = %e, "session task failed");
    }

    if let Some(renderer) = renderer
        && renderer.join().is_err()
    {
        tracing::error!("renderer thread panicked");
    }

    tracing::info!("daemon stopped");
    server_result
}

/// Wait for SIGTERM signal (used by systemd).
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| ShopAssistError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}
