//! Access gate HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Resolve every request path and decide access for the best route
//! - Apply reloaded configuration without restarting
//! - Stop gracefully on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::access::context::{Account, AccountDirectory, RequestContext};
use crate::config::schema::AppConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::{GateDecision, GateError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::Services;

/// Shared state behind the gate handler.
pub struct GateState {
    services: ArcSwap<Services>,
    accounts: ArcSwap<AccountDirectory>,
    route_set: ArcSwap<String>,
    account_header: String,
}

impl GateState {
    pub fn new(
        services: Services,
        accounts: AccountDirectory,
        route_set: impl Into<String>,
        account_header: impl Into<String>,
    ) -> Self {
        Self {
            services: ArcSwap::from_pointee(services),
            accounts: ArcSwap::from_pointee(accounts),
            route_set: ArcSwap::from_pointee(route_set.into()),
            account_header: account_header.into(),
        }
    }

    pub fn services(&self) -> Arc<Services> {
        self.services.load_full()
    }

    /// Name of the route set currently served.
    pub fn route_set(&self) -> Arc<String> {
        self.route_set.load_full()
    }

    /// Rebuild the route set from `config` and swap in its accounts.
    ///
    /// A renamed route set replaces the one served so far in the same store
    /// transaction. On failure the previous routes and accounts stay in effect.
    pub fn apply(&self, config: &AppConfig) -> Result<(), GateError> {
        let current = self.services.load_full();
        let previous = self.route_set.load_full();
        current.rebuild_replacing(&previous, &config.store.route_set, config.routes())?;

        self.services.store(Arc::new(current.refreshed()));
        self.route_set.store(Arc::new(config.store.route_set.clone()));
        self.accounts
            .store(Arc::new(AccountDirectory::new(config.accounts.iter().cloned())));

        tracing::info!(
            route_set = %config.store.route_set,
            routes = config.routes.len(),
            accounts = config.accounts.len(),
            "Configuration applied"
        );
        Ok(())
    }
}

/// HTTP front end deciding access for every request it receives.
pub struct GateServer {
    router: Router,
    state: Arc<GateState>,
}

impl GateServer {
    pub fn new(config: &AppConfig, services: Services) -> Self {
        let state = Arc::new(GateState::new(
            services,
            AccountDirectory::new(config.accounts.iter().cloned()),
            config.store.route_set.clone(),
            config.server.account_header.clone(),
        ));
        let router = Self::build_router(config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: Arc<GateState>) -> Router {
        Router::new()
            .fallback(gate_handler)
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> Arc<GateState> {
        self.state.clone()
    }

    /// Apply configurations from `updates` until shutdown.
    ///
    /// Each rebuild runs on the blocking pool since it may write the store file.
    pub fn spawn_reloader(
        &self,
        mut updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: &Shutdown,
    ) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        let stopped = shutdown.wait();
        tokio::spawn(async move {
            tokio::pin!(stopped);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    update = updates.recv() => match update {
                        Some(config) => {
                            let state = state.clone();
                            match tokio::task::spawn_blocking(move || state.apply(&config)).await {
                                Ok(Ok(())) => {}
                                Ok(Err(e)) => {
                                    tracing::error!(error = ?e, "Failed to apply reloaded configuration");
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "Configuration reload task failed");
                                }
                            }
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!("Config reloader stopped");
        })
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Access gate listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("Access gate stopped");
        Ok(())
    }
}

/// Resolve the path, pick the most specific route and decide access.
async fn gate_handler(State(state): State<Arc<GateState>>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let path = request.uri().path().to_string();
    let account = state
        .accounts
        .load()
        .lookup(request.header_str(&state.account_header));

    match decide(&state, &path, account, &request_id) {
        Ok(decision) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                route = %decision.route,
                granted = decision.granted,
                "Request gated"
            );
            decision.into_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path, status = %e.status(), "Request not gated");
            e.into_response()
        }
    }
}

fn decide(
    state: &GateState,
    path: &str,
    account: Account,
    request_id: &str,
) -> Result<GateDecision, GateError> {
    let services = state.services.load();
    let routes = services.resolver.resolve_path(path)?;
    let route = routes
        .first()
        .cloned()
        .ok_or_else(|| GateError::not_found(format!("No route found for path '{path}'")))?;

    let account_id = account.id.clone();
    let context = RequestContext::new(path, account).with_route(route.clone());
    let granted = services.access.check(&route, &context)?;

    Ok(GateDecision {
        granted,
        route: route.name.clone(),
        path: context.system_path().to_string(),
        account: account_id,
        parameters: context.attributes().clone(),
        request_id: request_id.to_string(),
    })
}
