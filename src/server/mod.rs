// Server module entry point
// Owns the listening socket and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::AppState;
use crate::logger;

/// HTTP server owning its listening socket.
///
/// Constructed with an explicit bind address; `run` blocks the calling task
/// until the shutdown notification fires.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind the listening socket
    pub fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        Ok(Self {
            listener: listener::create_listener(addr)?,
        })
    }

    /// Local address the server is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept-and-serve loop.
    ///
    /// Connections are serviced one at a time: each accepted connection is
    /// fully handled before the next accept. A slow client therefore delays
    /// later clients, but output from different requests can never
    /// interleave and responses always follow accept order.
    pub async fn run(self, state: Arc<AppState>, shutdown: Arc<Notify>) -> std::io::Result<()> {
        // Registered once up front so a notification fired while a
        // connection is being serviced is not lost
        let shutdown_signal = shutdown.notified();
        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            connection::serve_connection(stream, peer_addr, &state).await;
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown_signal => {
                    logger::log_shutdown();
                    return Ok(());
                }
            }
        }
    }
}
