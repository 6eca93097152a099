use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;
use tracing::{Instrument, info};

use crate::http::connection::Connection;
use crate::server::app::App;

/// Pause before retrying after a failed accept.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Signals the acceptor to stop.
///
/// Closing only stops new connections; accepted ones finish on their own
/// through client close or their idle timeout.
#[derive(Debug, Default)]
pub struct ShutdownHandle {
    closed: AtomicBool,
    notify: Notify,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
    shutdown: Arc<ShutdownHandle>,
}

impl Server {
    /// Binds the listening socket. A bind failure is returned immediately.
    pub async fn bind(addr: impl ToSocketAddrs, app: Arc<App>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind listener")?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            app,
            shutdown: Arc::new(ShutdownHandle::new()),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownHandle> {
        self.shutdown.clone()
    }

    /// Accept loop. Spawns one task per connection and returns once the
    /// shutdown handle is closed, dropping the listener.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            if self.shutdown.is_closed() {
                break;
            }

            let accepted = tokio::select! {
                res = self.listener.accept() => res,
                _ = self.shutdown.notify.notified() => continue,
            };

            let (socket, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    if self.shutdown.is_closed() {
                        break;
                    }
                    tracing::warn!(error = %e, "Accept failed, retrying");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            info!("Accepted connection from {}", peer);
            self.spawn_connection(socket, peer);
        }

        info!("Listener closed");
        Ok(())
    }

    fn spawn_connection(&self, socket: tokio::net::TcpStream, peer: SocketAddr) {
        let app = self.app.clone();
        let span = tracing::info_span!("conn", %peer);

        tokio::spawn(
            async move {
                let mut conn = Connection::new(socket, app);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {}", peer, e);
                }
                tracing::debug!(served = conn.served(), "Connection closed");
            }
            .instrument(span),
        );
    }
}
