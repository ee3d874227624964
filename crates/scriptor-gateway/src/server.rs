use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use scriptor_core::AskService;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

const DEFAULT_MAX_BODY_SIZE: usize = 1_048_576;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn AskService>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<dyn AskService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

/// HTTP front end for an [`AskService`], stopped through a `watch` channel.
pub struct GatewayServer {
    addr: SocketAddr,
    max_body_size: usize,
    service: Arc<dyn AskService>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    /// An unparsable `bind` address falls back to loopback.
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        service: Arc<dyn AskService>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr = parse_addr(bind, port);
        if addr.ip().is_unspecified() {
            tracing::warn!(%addr, "gateway listening on all interfaces without authentication");
        }
        Self {
            addr,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            service,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Configured address; port `0` means the OS picks one on [`Self::bind`].
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Open the listening socket without accepting connections yet.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bind`] if the address is unavailable.
    pub async fn bind(self) -> Result<BoundGateway, GatewayError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.addr,
                source,
            })?;
        Ok(BoundGateway {
            listener,
            router: build_router(AppState::new(self.service), self.max_body_size),
            shutdown_rx: self.shutdown_rx,
        })
    }

    /// Bind and serve until shutdown is signalled.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails or the server hits a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        self.bind().await?.serve().await
    }
}

/// A gateway whose socket is open.
pub struct BoundGateway {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl BoundGateway {
    /// Address actually bound.
    ///
    /// # Errors
    ///
    /// Returns the socket error, if any.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown is signalled, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Server`] on a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(%addr, "gateway listening");
        }
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_requested(self.shutdown_rx))
            .await?;
        tracing::info!("gateway stopped");
        Ok(())
    }
}

fn parse_addr(bind: &str, port: u16) -> SocketAddr {
    match bind.parse::<std::net::IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(e) => {
            tracing::warn!("invalid gateway bind '{bind}': {e}, using 127.0.0.1");
            SocketAddr::from(([127, 0, 0, 1], port))
        }
    }
}

/// Resolves once `true` is sent. A dropped sender never triggers shutdown.
async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
    tracing::info!("gateway shutting down");
}
