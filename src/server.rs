//! HTTP front end and process wiring.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use error_set::error_set;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tokio_postgres::Client;
use tracing::{error, info, instrument, warn};

use crate::catalog::SchemaUpdater;
use crate::generate::{GenerateError, GeminiClient, SqlGenerator};
use crate::metrics::{MetricsError, names, prometheus_install};
use crate::pg::{PgError, QueryExecutor, QueryRows, connect, schema_load};
use crate::query::RejectKind;
use crate::result::{MapIntoReport, ReportExt};
use crate::service::{QueryOutcome, QueryService};
use crate::settings::{CatalogSettings, PgSettings, Settings};

error_set! {
    ServerError = {
        Pg(PgError),
        Generate(GenerateError),
        Metrics(MetricsError),
        IoError(io::Error),
    };
}

pub type ServerResult<T> = Result<T, Report<ServerError>>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    detail: String,
    message: String,
}

#[derive(Debug, Default, Serialize)]
struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<QueryRows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

impl ErrorBody {
    fn new(kind: &'static str, detail: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            message: message.into(),
        }
    }

    fn schema_unavailable() -> Self {
        Self::new(
            RejectKind::SchemaUnavailable.as_str(),
            "schema not loaded",
            "Schema unavailable: schema not loaded",
        )
    }
}

fn outcome_response(outcome: QueryOutcome) -> Response {
    let (status, body) = match outcome {
        QueryOutcome::Incomplete { message } => (
            StatusCode::BAD_REQUEST,
            QueryResponse {
                error: Some(ErrorBody::new("IncompleteQuery", message, message)),
                ..Default::default()
            },
        ),
        QueryOutcome::SchemaUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            QueryResponse {
                error: Some(ErrorBody::schema_unavailable()),
                ..Default::default()
            },
        ),
        QueryOutcome::GenerationFailed { error } => (
            StatusCode::BAD_GATEWAY,
            QueryResponse {
                error: Some(ErrorBody::new(
                    "GenerationFailed",
                    error.clone(),
                    format!("SQL generation failed: {error}"),
                )),
                ..Default::default()
            },
        ),
        QueryOutcome::Rejected { sql, rejection } => {
            let status = match rejection.kind {
                RejectKind::SchemaUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let message = rejection.to_string();
            (
                status,
                QueryResponse {
                    sql: Some(sql),
                    error: Some(ErrorBody::new(
                        rejection.kind.as_str(),
                        rejection.detail,
                        message,
                    )),
                    ..Default::default()
                },
            )
        }
        QueryOutcome::Executed { sql, result } => (
            StatusCode::OK,
            QueryResponse {
                sql: Some(sql),
                results: Some(result),
                ..Default::default()
            },
        ),
        QueryOutcome::ExecutionFailed { sql, error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            QueryResponse {
                sql: Some(sql),
                error: Some(ErrorBody::new(
                    "ExecutionFailed",
                    error.clone(),
                    format!("Query execution failed: {error}"),
                )),
                ..Default::default()
            },
        ),
    };

    (status, Json(body)).into_response()
}

async fn query_post<G, X>(
    State(service): State<Arc<QueryService<G, X>>>,
    Json(request): Json<QueryRequest>,
) -> Response
where
    G: SqlGenerator + Send + Sync + 'static,
    X: QueryExecutor + Send + Sync + 'static,
{
    outcome_response(service.query_handle(&request.query).await)
}

async fn schema_get<G, X>(State(service): State<Arc<QueryService<G, X>>>) -> Response
where
    G: SqlGenerator + Send + Sync + 'static,
    X: QueryExecutor + Send + Sync + 'static,
{
    match service.schema() {
        Some(schema) => Json(schema.summary()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(QueryResponse {
                error: Some(ErrorBody::schema_unavailable()),
                ..Default::default()
            }),
        )
            .into_response(),
    }
}

async fn health_get() -> &'static str {
    "ok"
}

pub fn router<G, X>(service: Arc<QueryService<G, X>>) -> Router
where
    G: SqlGenerator + Send + Sync + 'static,
    X: QueryExecutor + Send + Sync + 'static,
{
    Router::new()
        .route("/query", post(query_post::<G, X>))
        .route("/schema", get(schema_get::<G, X>))
        .route("/health", get(health_get))
        .with_state(service)
}

/// Reload the schema once. The previous schema stays in place on failure.
pub async fn schema_refresh(
    client: &Client,
    catalog: &CatalogSettings,
    updater: &SchemaUpdater,
) -> bool {
    match schema_load(client, catalog).await {
        Ok(Some(schema)) => {
            updater.schema_update(schema);
            true
        }
        Ok(None) => false,
        Err(report) => {
            error!("schema refresh failed: {report}");
            metrics::counter!(names::SCHEMA_LOAD_ERRORS).increment(1);
            false
        }
    }
}

/// Periodically reload the schema, reconnecting when the connection drops.
#[instrument(skip_all)]
pub async fn schema_refresh_run(
    origin: PgSettings,
    catalog: CatalogSettings,
    mut client: Client,
    updater: SchemaUpdater,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick fires immediately and the schema was loaded at startup
    interval.tick().await;

    loop {
        interval.tick().await;

        if client.is_closed() {
            match connect(&origin, "schema").await {
                Ok(reconnected) => client = reconnected,
                Err(report) => {
                    warn!("schema refresh skipped: {report}");
                    metrics::counter!(names::SCHEMA_LOAD_ERRORS).increment(1);
                    continue;
                }
            }
        }

        schema_refresh(&client, &catalog, &updater).await;
    }
}

/// Load the schema, start the refresh task and serve HTTP until shutdown.
#[instrument(skip_all)]
pub async fn server_run(settings: &Settings) -> ServerResult<()> {
    if let Some(socket) = settings.metrics {
        prometheus_install(socket)
            .map_err(|e| e.into_current_context())
            .map_into_report::<ServerError>()
            .attach_loc("installing metrics exporter")?;
    }

    let generator = GeminiClient::new(&settings.generator).map_into_report::<ServerError>()?;

    let schema_client = connect(&settings.origin, "schema")
        .await
        .map_err(|e| e.into_current_context())
        .map_into_report::<ServerError>()?;
    let query_client = connect(&settings.origin, "query")
        .await
        .map_err(|e| e.into_current_context())
        .map_into_report::<ServerError>()?;

    let (updater, handle) = SchemaUpdater::new();
    match schema_load(&schema_client, &settings.catalog).await {
        Ok(Some(schema)) => updater.schema_update(schema),
        Ok(None) => warn!("starting without a schema, queries are refused until a refresh succeeds"),
        Err(report) => {
            error!("initial schema load failed: {report}");
            return Err(report.into_current_context())
                .map_into_report::<ServerError>()
                .attach_loc("loading initial schema");
        }
    }

    if settings.schema_refresh_secs > 0 {
        tokio::spawn(schema_refresh_run(
            settings.origin.clone(),
            settings.catalog.clone(),
            schema_client,
            updater,
            Duration::from_secs(settings.schema_refresh_secs),
        ));
    }

    let service = Arc::new(QueryService::new(handle, generator, query_client));
    let app = router(service);

    let listener = TcpListener::bind(&settings.listen.socket)
        .await
        .map_into_report::<ServerError>()
        .attach_loc("binding listen socket")?;
    info!("Listening to {}", &settings.listen.socket);

    axum::serve(listener, app)
        .await
        .map_into_report::<ServerError>()?;

    Ok(())
}
