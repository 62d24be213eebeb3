//! Async Unix socket IPC server for daemon control.

use crate::error::{Result, ShopAssistError};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// IPC server for handling daemon control commands via Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    shutdown: Arc<AtomicBool>,
}

impl IpcServer {
    /// Create a new IPC server bound to the specified socket path.
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("shopassist.sock")
        } else {
            // SAFETY: getuid has no preconditions and cannot fail.
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/shopassist-{}.sock", uid))
        }
    }

    /// Start the IPC server and handle incoming connections.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ShopAssistError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| ShopAssistError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;

        let handler = Arc::new(handler);

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            // Accept with timeout so the shutdown flag is polled
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            tracing::warn!(error = %e, "error handling IPC client");
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(ShopAssistError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }

    /// Stop the IPC server and clean up the socket file.
    pub fn stop(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ShopAssistError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection: one JSON line in, one JSON line out.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader
        .read_line(&mut line)
        .await
        .map_err(|e| ShopAssistError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    let command = Command::from_json(line.trim()).map_err(|e| ShopAssistError::IpcProtocol {
        message: format!("Failed to parse command: {}", e),
    })?;
    tracing::debug!(?command, "IPC command");

    let response = handler.handle(command).await;

    let mut response_json = response.to_json().map_err(|e| ShopAssistError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;
    response_json.push('\n');

    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| ShopAssistError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| ShopAssistError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::permission::CameraAccess;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct MockCommandHandler;

    #[async_trait::async_trait]
    impl CommandHandler for MockCommandHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Status => Response::Status {
                    camera: CameraAccess::Granted,
                    scanner_running: true,
                    scan_armed: true,
                    product_name: String::new(),
                    ocr_text: None,
                    image_path: None,
                },
                Command::Recognize => Response::Recognized {
                    text: "No text detected.".to_string(),
                },
                Command::Scan | Command::Grant | Command::Shutdown => Response::Ok,
            }
        }
    }

    async fn roundtrip(socket_path: &Path, command: Command) -> Response {
        let mut stream = UnixStream::connect(socket_path).await.unwrap();
        let command_json = format!("{}\n", command.to_json().unwrap());
        stream.write_all(command_json.as_bytes()).await.unwrap();

        let mut response_data = Vec::new();
        stream.read_to_end(&mut response_data).await.unwrap();
        let response_str = String::from_utf8(response_data).unwrap();
        Response::from_json(response_str.trim()).unwrap()
    }

    #[test]
    fn test_default_socket_path_returns_valid_path() {
        let path = IpcServer::default_socket_path();
        let path_str = path.to_string_lossy();
        if std::env::var("XDG_RUNTIME_DIR").is_ok() {
            assert!(path_str.ends_with("shopassist.sock"));
        } else {
            let uid = unsafe { libc::getuid() };
            assert_eq!(path_str, format!("/tmp/shopassist-{}.sock", uid));
        }
    }

    #[tokio::test]
    async fn test_server_answers_commands() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server_socket_path = socket_path.clone();
        let _server_handle = tokio::spawn(async move {
            IpcServer::new(server_socket_path)
                .start(MockCommandHandler)
                .await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(socket_path.exists());
        assert_eq!(roundtrip(&socket_path, Command::Scan).await, Response::Ok);
        assert!(matches!(
            roundtrip(&socket_path, Command::Status).await,
            Response::Status { scan_armed: true, .. }
        ));
        assert_eq!(
            roundtrip(&socket_path, Command::Recognize).await,
            Response::Recognized {
                text: "No text detected.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_multiple_concurrent_clients() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server_socket_path = socket_path.clone();
        let _server_handle = tokio::spawn(async move {
            IpcServer::new(server_socket_path)
                .start(MockCommandHandler)
                .await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let mut client_handles = vec![];
        for i in 0..5 {
            let socket_path = socket_path.clone();
            client_handles.push(tokio::spawn(async move {
                let command = if i % 2 == 0 {
                    Command::Status
                } else {
                    Command::Scan
                };
                roundtrip(&socket_path, command).await
            }));
        }

        for handle in client_handles {
            let response = handle.await.unwrap();
            assert!(matches!(response, Response::Status { .. } | Response::Ok));
        }
    }

    #[tokio::test]
    async fn test_stop_ends_accept_loop_and_removes_socket() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = Arc::new(IpcServer::new(socket_path.clone()));
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.start(MockCommandHandler).await });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert!(socket_path.exists());

        server.stop().unwrap();
        let result = tokio::time::timeout(tokio::time::Duration::from_secs(2), task)
            .await
            .expect("server should stop")
            .unwrap();
        assert!(result.is_ok());
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_server_survives_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server_socket_path = socket_path.clone();
        let _server_handle = tokio::spawn(async move {
            IpcServer::new(server_socket_path)
                .start(MockCommandHandler)
                .await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let mut stream = UnixStream::connect(&socket_path).await.unwrap();
        stream.write_all(b"not valid json\n").await.unwrap();
        drop(stream);

        assert_eq!(roundtrip(&socket_path, Command::Scan).await, Response::Ok);
    }
}
