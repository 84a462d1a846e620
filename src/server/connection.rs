// Connection handling module
// Serves a single accepted TCP connection

use std::sync::atomic::Ordering;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Serve one HTTP exchange on an accepted connection.
///
/// The stream is wrapped in `TokioIo` and handed to hyper with keep-alive
/// disabled: one request is read, answered, and the connection closes. The
/// caller awaits this to completion, so connections are serviced strictly
/// in accept order.
pub async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
) {
    let access_log = state.cached_access_log.load(Ordering::Relaxed);
    if access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    let io = TokioIo::new(stream);
    let state = Arc::clone(state);

    let conn = http1::Builder::new().keep_alive(false).serve_connection(
        io,
        service_fn(move |req| {
            let state = Arc::clone(&state);
            async move { handler::handle_request(req, peer_addr, state).await }
        }),
    );

    if let Err(err) = conn.await {
        logger::log_connection_error(&err);
    }
}
