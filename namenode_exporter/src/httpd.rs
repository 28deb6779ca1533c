//! The HTTP surface.
//!
//! Two routes are served. The telemetry path answers with a fresh gather of
//! the [`Registry`] in the Prometheus text format. Every other path answers
//! with a small HTML page linking to the telemetry path.
//!
//! Connections beyond the configured concurrency limit are accepted and then
//! immediately dropped. On shutdown every open connection is told to finish
//! its in-flight request and close; connections still open after
//! [`DRAIN_TIMEOUT`] are abandoned.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::{Request, Response, StatusCode, header};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::{
    net::TcpListener,
    pin,
    sync::{Semaphore, TryAcquireError},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

use crate::{registry::Registry, signals::Watcher};

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Upper bound on how long a connection may keep running after shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors produced by [`Server`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::io::Error`].
    #[error("Unable to bind {addr}: {source}")]
    Bind {
        /// The address requested
        addr: SocketAddr,
        /// The underlying failure
        #[source]
        source: std::io::Error,
    },
    /// Wrapper for [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The exporter's HTTP server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    concurrency_limit: usize,
    registry: Arc<Registry>,
    telemetry_path: Arc<str>,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Function will return an error if `addr` cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        concurrency_limit: usize,
        registry: Arc<Registry>,
        telemetry_path: &str,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Ok(Self {
            listener,
            concurrency_limit,
            registry,
            telemetry_path: Arc::from(telemetry_path),
        })
    }

    /// The address actually bound, useful when binding port 0.
    ///
    /// # Errors
    ///
    /// Function will return an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` fires, then drain open connections.
    ///
    /// # Errors
    ///
    /// None known. Failures on individual connections are logged.
    pub async fn run(self, shutdown: Watcher) -> Result<(), Error> {
        let Self {
            listener,
            concurrency_limit,
            registry,
            telemetry_path,
        } = self;
        let sem = Arc::new(Semaphore::new(concurrency_limit));
        let mut join_set = JoinSet::new();

        let local_addr = listener.local_addr()?;
        info!("Serving {telemetry_path} on {local_addr}");

        let mut accepting = shutdown.clone();
        let shutdown_fut = accepting.recv();
        pin!(shutdown_fut);
        loop {
            tokio::select! {
                () = &mut shutdown_fut => {
                    info!("Shutdown signal received, stopping accept loop.");
                    break;
                }

                incoming = listener.accept() => {
                    let (stream, addr) = match incoming {
                        Ok(sa) => sa,
                        Err(e) => {
                            error!("Error accepting connection: {e}");
                            continue;
                        }
                    };
                    debug!("Accepted connection from {addr}");

                    let sem = Arc::clone(&sem);
                    let registry = Arc::clone(&registry);
                    let telemetry_path = Arc::clone(&telemetry_path);
                    let mut conn_shutdown = shutdown.clone();

                    join_set.spawn(async move {
                        let permit = match sem.try_acquire() {
                            Ok(p) => p,
                            Err(TryAcquireError::Closed) => {
                                error!("Semaphore closed");
                                return;
                            }
                            Err(TryAcquireError::NoPermits) => {
                                warn!("httpd over connection capacity, load shedding");
                                drop(stream);
                                return;
                            }
                        };

                        let service = hyper::service::service_fn(move |req| {
                            srv(req, Arc::clone(&registry), Arc::clone(&telemetry_path))
                        });
                        let builder = auto::Builder::new(TokioExecutor::new());
                        let conn =
                            builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                        pin!(conn);

                        let res = tokio::select! {
                            res = conn.as_mut() => res,
                            () = conn_shutdown.recv() => {
                                debug!("Draining connection from {addr}");
                                conn.as_mut().graceful_shutdown();
                                match tokio::time::timeout(DRAIN_TIMEOUT, conn.as_mut()).await {
                                    Ok(res) => res,
                                    Err(_) => {
                                        warn!("Connection from {addr} did not drain, abandoning");
                                        Ok(())
                                    }
                                }
                            }
                        };
                        if let Err(e) = res {
                            error!("Error serving {addr}: {e}");
                        }
                        drop(permit);
                    });
                }
            }
        }

        drop(listener);
        // Every connection task observes `shutdown` and is bounded by
        // DRAIN_TIMEOUT once it fires.
        while join_set.join_next().await.is_some() {}
        Ok(())
    }
}

async fn srv(
    req: Request<hyper::body::Incoming>,
    registry: Arc<Registry>,
    telemetry_path: Arc<str>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    if req.uri().path() == &*telemetry_path {
        let body = registry.gather().await;
        Ok(build_response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, body))
    } else {
        Ok(build_response(
            StatusCode::OK,
            "text/html; charset=utf-8",
            landing_page(&telemetry_path),
        ))
    }
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Namenode Exporter</title></head>\n\
         <body>\n\
         <h1>Namenode Exporter</h1>\n\
         <p><a href='{telemetry_path}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

fn full(body: impl Into<Bytes>) -> BoxBody<Bytes, hyper::Error> {
    Full::new(body.into())
        .map_err(|never| match never {})
        .boxed()
}

fn build_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let mut resp = Response::new(full(body));
    *resp.status_mut() = status;
    match header::HeaderValue::from_str(content_type) {
        Ok(value) => {
            resp.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        Err(e) => error!("Invalid content type {content_type}: {e}"),
    }
    resp
}
