//! HTTP stats server (spec §4.10): serves the shared-memory-mirror
//! `RouterStats` snapshot as JSON over a `/stats` endpoint. Same
//! `tiny_http` request loop and polling-shutdown shape as the teacher's
//! `network::stats_server::StatsServer`, adapted to serve one
//! `Arc<RouterStats>` instead of `NodeStats` (no per-interface named
//! fields, no routing/queue-backlog stats from the mesh layer).

use crate::radio::stats::RouterStats;
use log::{error, info, warn};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tiny_http::{Method, Response, Server};

/// Default port for the stats server.
pub const DEFAULT_STATS_PORT: u16 = 8080;

/// HTTP stats server.
///
/// Runs in a background thread and serves router statistics as JSON.
pub struct StatsServer {
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl StatsServer {
    /// Start the stats server.
    ///
    /// `bind_addr` of `None` binds `0.0.0.0`. Drop the returned handle
    /// (or call `stop`) to shut the server down.
    pub fn start(
        bind_addr: Option<IpAddr>,
        port: u16,
        stats: Arc<RouterStats>,
    ) -> Result<Self, std::io::Error> {
        let addr = match bind_addr {
            Some(ip) => format!("{}:{}", ip, port),
            None => format!("0.0.0.0:{}", port),
        };

        let server = Server::http(&addr)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::AddrInUse, format!("{}", e)))?;

        info!("stats server listening on http://{}/stats", addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::spawn(move || {
            Self::run_server(server, stats, shutdown_clone);
        });

        Ok(Self { handle: Some(handle), shutdown })
    }

    fn run_server(server: Server, stats: Arc<RouterStats>, shutdown: Arc<AtomicBool>) {
        let content_type =
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("static header");
        let location =
            tiny_http::Header::from_bytes(&b"Location"[..], &b"/stats"[..]).expect("static header");
        let allow_get =
            tiny_http::Header::from_bytes(&b"Allow"[..], &b"GET"[..]).expect("static header");

        loop {
            if shutdown.load(Ordering::Acquire) {
                info!("stats server shutting down");
                break;
            }

            match server.recv_timeout(std::time::Duration::from_millis(100)) {
                Ok(Some(request)) => {
                    if request.method() != &Method::Get {
                        let response = Response::from_string("Method Not Allowed")
                            .with_status_code(405)
                            .with_header(allow_get.clone());
                        let _ = request.respond(response);
                        continue;
                    }

                    let path = request.url();

                    if path == "/stats" || path == "/stats/" {
                        let json = stats.to_json();
                        let response = Response::from_string(json)
                            .with_header(content_type.clone())
                            .with_status_code(200);

                        if let Err(e) = request.respond(response) {
                            warn!("failed to send response: {}", e);
                        }
                    } else if path == "/" {
                        let response = Response::from_string("See /stats for router statistics")
                            .with_status_code(302)
                            .with_header(location.clone());

                        if let Err(e) = request.respond(response) {
                            warn!("failed to send redirect: {}", e);
                        }
                    } else {
                        let response = Response::from_string("Not Found").with_status_code(404);
                        if let Err(e) = request.respond(response) {
                            warn!("failed to send 404: {}", e);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!("stats server error: {}", e);
                    break;
                }
            }
        }
    }

    /// Stop the server. May take up to 100ms due to polling interval.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatsServer {
    fn drop(&mut self) {
        self.stop();
    }
}
