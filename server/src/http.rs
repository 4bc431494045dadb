use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use platform_authz::{Action, Decision, DenyReason, PolicyEngine, Resource, RouteRegistry};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    config::AppConfig,
    graphql::SchemaType,
    profiles::{Caller, ProfileStore},
};

#[derive(Clone)]
pub struct AppState {
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub registry: Arc<RouteRegistry>,
}

impl AppState {
    /// Identity comes from headers set by the authenticating gateway.
    fn caller(&self, headers: &HeaderMap) -> Caller {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };
        Caller::resolve(
            self.profiles.as_ref(),
            header(&self.config.user_header),
            header(&self.config.sector_header),
        )
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(addr = %config.addr, "portal server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .route("/guard/admin", get(admin_guard_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let caller = state.caller(&headers);
    let req = request.into_inner().data(caller);
    state.schema.execute(req).await.into()
}

#[derive(Deserialize)]
struct GuardQuery {
    route: String,
}

#[derive(Debug, Serialize)]
struct GuardDenied {
    route: String,
    reason: &'static str,
}

/// Route guard for the admin UI: 204 when the page may open, 401/403 otherwise.
async fn admin_guard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GuardQuery>,
) -> HttpResult<StatusCode> {
    let caller = state.caller(&headers);
    if caller.user_id.is_none() {
        return Err(HttpError::new(StatusCode::UNAUTHORIZED, "missing caller identity"));
    }
    let decision = PolicyEngine.evaluate(
        &caller.subject(),
        &Resource::AdminRoute(&query.route),
        Action::View,
    );
    match decision {
        Decision::Allowed(_) => Ok(StatusCode::NO_CONTENT),
        Decision::Denied(reason) => Err(HttpError::denied(query.route, reason)),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        profiles: state.profiles.len(),
        routes: state.registry.len(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    profiles: usize,
    routes: usize,
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
enum HttpError {
    Message { status: StatusCode, message: String },
    Denied(GuardDenied),
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self::Message {
            status,
            message: msg.to_string(),
        }
    }

    fn denied(route: String, reason: DenyReason) -> Self {
        Self::Denied(GuardDenied {
            route,
            reason: reason.code(),
        })
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::Message { status, message } => (status, message).into_response(),
            HttpError::Denied(body) => (StatusCode::FORBIDDEN, Json(body)).into_response(),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
