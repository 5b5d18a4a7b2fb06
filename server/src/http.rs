use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use platform_api::ApiError;
use products_crm::{DealError, DealService};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::api_error,
    graphql::{
        ActivityNode, DealNode, NewDealInput, PipelineReportNode, SchemaType, TransitionInput,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub service: DealService,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
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

    info!(%config.addr, "deals server listening");
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
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let cors = cors_layer(&state.config.cors_allowed_origins);
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .route("/api/deals", post(create_deal_handler))
        .route(
            "/api/deals/{id}",
            get(get_deal_handler).patch(transition_handler),
        )
        .route("/api/deals/{id}/activities", get(activities_handler))
        .route("/api/pipelines/{id}/report", get(report_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn graphql_handler(State(state): State<AppState>, request: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.service.db().ping().await.is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn create_deal_handler(
    State(state): State<AppState>,
    Json(input): Json<NewDealInput>,
) -> HttpResult<(StatusCode, Json<DealNode>)> {
    let deal = state
        .service
        .create_deal(input.into_request(&state.config.default_pipeline))
        .await?;
    Ok((StatusCode::CREATED, Json(deal.into())))
}

async fn get_deal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<DealNode>> {
    let deal = state.service.deal(id).await?;
    Ok(Json(deal.into()))
}

async fn transition_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> HttpResult<Json<DealNode>> {
    let outcome = state.service.transition(input.into_request(id)).await?;
    Ok(Json(outcome.deal.into()))
}

async fn activities_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<Vec<ActivityNode>>> {
    let activities = state.service.activities(id).await?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

async fn report_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<PipelineReportNode>> {
    let report = state.service.report(id).await?;
    Ok(Json(report.into()))
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError(ApiError);

impl From<DealError> for HttpError {
    fn from(value: DealError) -> Self {
        Self(api_error(value))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body())).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for CTRL+C");
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
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
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
    info!("shutdown signal received");
}
