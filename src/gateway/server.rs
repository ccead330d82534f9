//! Gateway HTTP server
//!
//! Serves the viewer page and the MJPEG stream from the shared snapshot.
//! The server runs on a dedicated thread so the ingest hot path never
//! contends with HTTP. Each streaming connection is its own response stream
//! holding its own snapshot watcher: it advances at whatever pace its peer
//! can take, skipping frames it missed, and its teardown affects nobody
//! else.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    http::header,
    web::{self, Bytes},
    App, HttpResponse, HttpServer,
};
use async_stream::stream;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::gateway::config::GatewayConfig;
use crate::gateway::snapshot::{FrameSnapshot, SnapshotCell};

/// MJPEG part boundary. Browsers only need it to match the response header.
const BOUNDARY: &str = "frame";

static INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Shared state backing HTTP handlers.
struct ServerState {
    cell: Arc<SnapshotCell>,
    stream_wait: Duration,
}

/// Handle for the HTTP server thread.
pub struct GatewayServer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl GatewayServer {
    /// Signal the server to stop and block until the thread exits.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawn the HTTP server thread and return a handle that can stop it.
pub fn spawn_http_server(config: &GatewayConfig, cell: Arc<SnapshotCell>) -> Result<GatewayServer> {
    let http_addr = config.http_addr;
    let stream_wait = config.stream_wait;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = std::thread::Builder::new()
        .name("gateway-http".into())
        .spawn(move || {
            let outcome = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(ServerState {
                            cell: cell.clone(),
                            stream_wait,
                        }))
                        .route("/", web::get().to(index_route))
                        .route("/frame.jpg", web::get().to(frame_route))
                        .route("/meta.json", web::get().to(meta_route))
                        .route("/stream.mjpg", web::get().to(stream_route))
                })
                .disable_signals()
                .bind(http_addr)?
                .run();

                tracing::info!(addr = %http_addr, "Gateway HTTP listening");

                let srv_handle = server.handle();
                actix_web::rt::spawn(async move {
                    let _ = shutdown_rx.await;
                    srv_handle.stop(true).await;
                });

                server.await
            });

            if let Err(e) = outcome {
                tracing::error!(error = %e, "HTTP server error");
            }
        })
        .map_err(Error::Io)?;

    Ok(GatewayServer {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// Serve the static viewer page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Latest frame as a single JPEG. Handy for probes and tests.
async fn frame_route(state: web::Data<ServerState>) -> HttpResponse {
    match state.cell.latest() {
        Some(snapshot) => HttpResponse::Ok()
            .content_type("image/jpeg")
            .insert_header((header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"))
            .body(snapshot.payload.clone()),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Latest frame's metadata record as JSON.
async fn meta_route(state: web::Data<ServerState>) -> HttpResponse {
    match state.cell.latest() {
        Some(snapshot) => HttpResponse::Ok()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(&snapshot.metadata),
        None => HttpResponse::NoContent().finish(),
    }
}

/// The MJPEG stream.
///
/// `CONNECTED → STREAMING → CLOSED`: the response stream repeatedly waits
/// for the snapshot to change (bounded by `stream_wait`), then yields one
/// boundary-delimited part. On timeout it re-sends the current frame; that
/// keep-alive write is also what surfaces dead peers. Dropping the response
/// (client disconnect) is the CLOSED transition; nothing else is affected.
async fn stream_route(state: web::Data<ServerState>) -> HttpResponse {
    let mut watcher = state.cell.watch();
    let wait = state.stream_wait;

    let parts = stream! {
        loop {
            let snapshot = watcher.borrow_and_update().clone();
            if let Some(snapshot) = snapshot {
                yield Ok::<Bytes, actix_web::Error>(mjpeg_part(&snapshot));
            }

            match tokio::time::timeout(wait, watcher.changed()).await {
                Ok(Ok(())) => {}   // new snapshot; yield it next turn
                Ok(Err(_)) => break, // ingest side gone; shutting down
                Err(_) => {}       // wait bound hit; re-send as keep-alive
            }
        }
    };

    HttpResponse::Ok()
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
        ))
        .insert_header((header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"))
        .insert_header((header::PRAGMA, "no-cache"))
        .insert_header((header::EXPIRES, "0"))
        // Keeps buffering reverse proxies from holding parts back.
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(parts)
}

/// Encode one snapshot as a boundary-delimited MJPEG part.
fn mjpeg_part(snapshot: &FrameSnapshot) -> Bytes {
    let payload = &snapshot.payload;
    let mut part = Vec::with_capacity(payload.len() + 96);
    part.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    part.extend_from_slice(b"Content-Type: image/jpeg\r\n");
    part.extend_from_slice(format!("Content-Length: {}\r\n\r\n", payload.len()).as_bytes());
    part.extend_from_slice(payload);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::FrameMetadata;

    fn snapshot(seq: u64, payload: &'static [u8]) -> FrameSnapshot {
        FrameSnapshot {
            metadata: FrameMetadata::new(seq, 0, 2, 2, 80, "test"),
            payload: bytes::Bytes::from_static(payload),
        }
    }

    #[test]
    fn test_mjpeg_part_framing() {
        let part = mjpeg_part(&snapshot(1, &[0xFF, 0xD8, 0xFF, 0xD9]));
        let text = String::from_utf8_lossy(&part);

        assert!(text.starts_with("--frame\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("Content-Length: 4\r\n\r\n"));
        assert!(part.ends_with(b"\r\n"));
    }

    #[test]
    fn test_mjpeg_part_declares_exact_payload_length() {
        let payload: &[u8] = &[0u8; 333];
        let part = mjpeg_part(&FrameSnapshot {
            metadata: FrameMetadata::new(0, 0, 1, 1, 80, "test"),
            payload: bytes::Bytes::from_static(payload),
        });

        let text = String::from_utf8_lossy(&part);
        assert!(text.contains("Content-Length: 333\r\n"));
    }

    /// Two watchers over one cell advance independently: dropping one must
    /// leave the other's view of the sequence intact and contiguous.
    #[tokio::test]
    async fn test_client_isolation_on_disconnect() {
        let cell = Arc::new(SnapshotCell::new());
        let mut surviving = cell.watch();
        let doomed = cell.watch();

        cell.store(snapshot(1, &[1]));
        surviving.changed().await.unwrap();
        assert_eq!(surviving.borrow_and_update().clone().unwrap().metadata.seq, 1);

        // One client disconnects; its watcher is simply dropped.
        drop(doomed);

        cell.store(snapshot(2, &[2]));
        surviving.changed().await.unwrap();
        assert_eq!(surviving.borrow_and_update().clone().unwrap().metadata.seq, 2);
    }
}
