use crate::app::AppEvent;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub const SHOW_COMMAND: &[u8] = b"SHOW";
const CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);
const MAX_COMMAND_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("another instance holds {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("cannot use lock file {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot listen on 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Holds the advisory lock and the loopback listener for the life of the
/// process.
pub struct InstanceGuard {
    _lock: File,
    listener: Option<std::net::TcpListener>,
    port: u16,
}

/// Takes the lock file and binds the loopback port.
pub fn acquire(lock_path: &Path, port: u16) -> Result<InstanceGuard, InstanceError> {
    let lock_err = |source| InstanceError::Lock {
        path: lock_path.to_path_buf(),
        source,
    };
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(lock_err)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(lock_err)?;
    match file.try_lock() {
        Ok(()) => {}
        Err(TryLockError::WouldBlock) => {
            return Err(InstanceError::AlreadyRunning(lock_path.to_path_buf()));
        }
        Err(TryLockError::Error(source)) => return Err(lock_err(source)),
    }

    let listener = std::net::TcpListener::bind(("127.0.0.1", port))
        .map_err(|source| InstanceError::Bind { port, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| InstanceError::Bind { port, source })?;
    let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);

    Ok(InstanceGuard {
        _lock: file,
        listener: Some(listener),
        port,
    })
}

impl InstanceGuard {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Spawns the listener task; each `SHOW` becomes [`AppEvent::Show`].
    pub fn serve(&mut self, tx: UnboundedSender<AppEvent>) -> std::io::Result<()> {
        let Some(std_listener) = self.listener.take() else {
            return Ok(());
        };
        let listener = TcpListener::from_std(std_listener)?;
        info!("Listening for {} on 127.0.0.1:{}", String::from_utf8_lossy(SHOW_COMMAND), self.port);

        tokio::spawn(async move {
            loop {
                let (mut stream, peer) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("IPC accept failed: {}", e);
                        continue;
                    }
                };
                let mut buf = [0u8; MAX_COMMAND_LEN];
                let read = tokio::time::timeout(CONNECT_TIMEOUT, stream.read(&mut buf)).await;
                match read {
                    Ok(Ok(n)) if buf[..n].trim_ascii() == SHOW_COMMAND => {
                        debug!("SHOW from {}", peer);
                        if tx.send(AppEvent::Show).is_err() {
                            break;
                        }
                    }
                    Ok(Ok(n)) => debug!("Ignoring IPC payload of {} bytes from {}", n, peer),
                    Ok(Err(e)) => debug!("IPC read from {} failed: {}", peer, e),
                    Err(_) => debug!("IPC read from {} timed out", peer),
                }
            }
        });
        Ok(())
    }
}

/// Asks the running instance to come forward. Failures are ignored.
pub async fn notify_existing_instance(port: u16) {
    let connect =
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await;
    match connect {
        Ok(Ok(mut stream)) => {
            if let Err(e) = stream.write_all(SHOW_COMMAND).await {
                debug!("Failed to send SHOW: {}", e);
            }
            let _ = stream.shutdown().await;
        }
        Ok(Err(e)) => debug!("No instance listening on {}: {}", port, e),
        Err(_) => debug!("Timed out connecting to instance on {}", port),
    }
}
