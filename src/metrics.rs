use std::net::SocketAddr;

use error_set::error_set;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use rootcause::Report;
use tracing::info;

use crate::result::MapIntoReport;

error_set! {
    MetricsError = {
        Build(BuildError),
    };
}

pub type MetricsResult<T> = Result<T, Report<MetricsError>>;

/// Names of every metric the service records.
pub mod names {
    // Request pipeline counters
    pub const QUERIES_TOTAL: &str = "sqlgate.queries.total";
    pub const QUERIES_INCOMPLETE: &str = "sqlgate.queries.incomplete";
    pub const QUERIES_EXECUTED: &str = "sqlgate.queries.executed";
    pub const QUERIES_EXECUTION_ERRORS: &str = "sqlgate.queries.execution_errors";
    pub const QUERIES_GENERATION_ERRORS: &str = "sqlgate.queries.generation_errors";

    // Validation outcomes (rejections carry a `kind` label)
    pub const VALIDATION_APPROVED: &str = "sqlgate.validation.approved";
    pub const VALIDATION_REJECTED: &str = "sqlgate.validation.rejected";

    // Latency histograms (seconds per Prometheus convention)
    pub const GENERATION_LATENCY_SECONDS: &str = "sqlgate.generation.latency_seconds";
    pub const EXECUTION_LATENCY_SECONDS: &str = "sqlgate.execution.latency_seconds";
    pub const QUERY_LATENCY_SECONDS: &str = "sqlgate.query.latency_seconds";

    // Schema introspection
    pub const SCHEMA_LOADS: &str = "sqlgate.schema.loads";
    pub const SCHEMA_LOAD_INCOMPLETE: &str = "sqlgate.schema.load_incomplete";
    pub const SCHEMA_LOAD_ERRORS: &str = "sqlgate.schema.load_errors";
    pub const SCHEMA_TABLES: &str = "sqlgate.schema.tables";
}

/// Install the Prometheus recorder with an HTTP listener on `socket`.
///
/// Must be called from within a tokio runtime; the exporter runs as a task on it.
pub fn prometheus_install(socket: SocketAddr) -> MetricsResult<()> {
    PrometheusBuilder::new()
        .set_quantiles(&[0.5, 0.95, 0.99])
        .map_into_report::<MetricsError>()?
        .with_http_listener(socket)
        .install()
        .map_into_report::<MetricsError>()?;

    info!("serving metrics on {socket}");
    Ok(())
}
