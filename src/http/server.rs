//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API handler
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath, Request},
    http::{Request as HttpRequest, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::admin_router;
use crate::config::network::NetworkId;
use crate::config::schema::{AdminConfig, ListenerConfig};
use crate::http::handlers;
use crate::ledger::catalog::AbiCatalog;
use crate::ledger::client::Ledger;
use crate::ledger::submitter::TxSubmitter;
use crate::observability::metrics;
use crate::relay::dispatcher::RelayDispatcher;
use crate::store::subscriptions::SubscriptionStore;
use crate::subscriptions::registry::SubscriptionRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub store: Arc<SubscriptionStore>,
    pub registry: SubscriptionRegistry,
    pub dispatcher: RelayDispatcher,
    pub abis: Arc<AbiCatalog>,
    pub admin: AdminConfig,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<SubscriptionStore>,
        submitter: TxSubmitter,
        abis: Arc<AbiCatalog>,
        admin: AdminConfig,
    ) -> Self {
        Self {
            registry: SubscriptionRegistry::new(ledger.clone(), store.clone()),
            dispatcher: RelayDispatcher::new(ledger.clone(), submitter),
            ledger,
            store,
            abis,
            admin,
        }
    }

    pub fn network(&self) -> NetworkId {
        self.store.network()
    }
}

/// HTTP server for the relayer API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over `state`.
    pub fn new(state: AppState, config: &ListenerConfig) -> Self {
        Self {
            router: build_router(state, config),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState, config: &ListenerConfig) -> Router {
    let api = Router::new()
        .route("/", get(handlers::banner))
        .route("/health", get(handlers::health))
        .route("/miner", get(handlers::miner))
        .route("/subscriptions", get(handlers::subscriptions))
        .route("/contracts", get(handlers::contracts))
        .route("/subcontracts", get(handlers::subcontracts))
        .route("/deploy", post(handlers::deploy))
        .route("/deploysub", post(handlers::deploy_sub))
        .route("/sigs/{address}", get(handlers::authorizations))
        .route("/sign", post(handlers::sign))
        .route("/abi/{address}", get(handlers::abi))
        .route("/saveSubscription", post(handlers::save_subscription))
        .route("/relayMetaTx", post(handlers::relay_meta_tx))
        .with_state(state.clone())
        .merge(admin_router(state))
        .route_layer(middleware::from_fn(track_requests));

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &HttpRequest<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ));

    api.layer(DefaultBodyLimit::max(config.max_body_size)).layer(layers)
}

/// Count requests by matched route and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16());
    response
}
