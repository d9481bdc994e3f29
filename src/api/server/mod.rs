/// The custody API request handlers.
mod handlers;
/// The custody API authentication headers.
mod headers;
/// The custody API middleware.
mod middleware;

use middleware::track_server_metrics;

use std::{fmt, future::Future, net::SocketAddr, pin::Pin, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use eyre::{OptionExt, WrapErr};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use crate::{
    api::spec::{self, CustodyApi, CustodyApiError, Query},
    error::CustodyError,
    primitives::CallContext,
    system::Call,
};

/// A request forwarded by the API to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyRequest {
    /// Run a call atomically.
    Execute {
        /// The authenticated call context.
        ctx: CallContext,
        /// The nonce the request was signed with.
        nonce: u64,
        /// The call.
        call: Call,
    },
    /// Answer a read-only question.
    Query(Query),
}

/// Event type emitted by the custody API.
#[derive(Debug)]
pub struct CustodyEvent {
    /// The request to process.
    pub request: CustodyRequest,
    /// The response channel.
    pub response: oneshot::Sender<Result<Value, CustodyError>>,
}

/// The inner custody API handler that implements [CustodyApi].
/// Should be wrapped by a [CustodyApiServer] JSON-RPC server to handle requests.
#[derive(Debug)]
pub struct CustodyApiInner {
    /// Event notification channel
    events: mpsc::Sender<CustodyEvent>,
}

impl CustodyApiInner {
    /// Creates a new instance of the custody API handler.
    pub fn new(events: mpsc::Sender<CustodyEvent>) -> Self {
        Self { events }
    }

    async fn send(&self, request: CustodyRequest) -> Result<Value, CustodyApiError> {
        let (response_tx, response_rx) = oneshot::channel();

        let event = CustodyEvent { request, response: response_tx };
        self.events.send(event).await.map_err(|_| CustodyApiError::Internal)?;

        Ok(response_rx.await.map_err(|_| CustodyApiError::Internal)??)
    }
}

#[async_trait::async_trait]
impl CustodyApi for CustodyApiInner {
    async fn execute(
        &self,
        ctx: CallContext,
        nonce: u64,
        call: Call,
    ) -> Result<Value, CustodyApiError> {
        self.send(CustodyRequest::Execute { ctx, nonce, call }).await
    }

    async fn query(&self, query: Query) -> Result<Value, CustodyApiError> {
        self.send(CustodyRequest::Query(query)).await
    }
}

/// The outer custody JSON-RPC server that wraps the [CustodyApiInner] handler.
pub struct CustodyApiServer {
    /// The address to bind the server to. This will be updated
    /// with the actual address after the server is started.
    addr: SocketAddr,
    /// The shutdown signal.
    signal: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl fmt::Debug for CustodyApiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodyApiServer").field("addr", &self.addr).finish()
    }
}

impl CustodyApiServer {
    /// Creates the server with the given address and default shutdown signal (CTRL+C).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            signal: Some(Box::pin(async {
                let _ = tokio::signal::ctrl_c().await;
            })),
        }
    }

    /// Replaces the shutdown signal.
    pub fn with_shutdown<S>(self, signal: S) -> Self
    where
        S: Future<Output = ()> + Send + 'static,
    {
        Self { signal: Some(Box::pin(signal)), ..self }
    }

    /// Runs the JSON-RPC server, sending events to the provided channel.
    pub async fn run(&mut self, events_tx: mpsc::Sender<CustodyEvent>) -> eyre::Result<()> {
        let api = Arc::new(CustodyApiInner::new(events_tx));

        let router = make_router(api);

        let listener = TcpListener::bind(self.addr)
            .await
            .wrap_err_with(|| format!("failed to bind custody API server to {}", self.addr))?;

        let addr = listener.local_addr()?;
        self.addr = addr;

        info!("Custody RPC server bound to {addr}");

        let signal = self.signal.take().ok_or_eyre("custody API server already running")?;

        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).with_graceful_shutdown(signal).await {
                error!(?err, "Custody API server error");
            }
        });

        Ok(())
    }

    /// Returns the local addr the server is listening on (or configured with).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Creates a new [Router]
///
/// NOTE: Keeping the router separate from the server start method allows
/// for easier integration testing through the [`tower::Service`] interface.
#[inline]
fn make_router(state: Arc<CustodyApiInner>) -> Router {
    Router::new()
        .route("/", post(handlers::rpc_entrypoint))
        .route("/status", get(handlers::status))
        .fallback(handlers::not_found)
        .layer(TimeoutLayer::new(spec::MAX_REQUEST_TIMEOUT))
        .route_layer(axum::middleware::from_fn(track_server_metrics))
        .with_state(state)
}
