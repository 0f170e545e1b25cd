//! Request pipeline: natural language in, validated and executed SQL out.
//!
//! ```text
//! input -> incomplete? -> prompt -> generate -> clean -> validate -> execute
//! ```
//!
//! Generated SQL reaches the executor only after the validator approves it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{SchemaHandle, SchemaModel};
use crate::generate::{SqlGenerator, input_incomplete, prompt_build};
use crate::metrics::names;
use crate::pg::{QueryExecutor, QueryRows};
use crate::query::{Rejection, Validator, Verdict, sql_clean};

/// What happened to one request.
#[derive(Debug)]
pub enum QueryOutcome {
    /// Input too short; nothing was generated.
    Incomplete { message: &'static str },
    /// No schema is loaded, so nothing can be generated or validated.
    SchemaUnavailable,
    /// The generator failed or returned nothing.
    GenerationFailed { error: String },
    /// The generated SQL references something the schema does not have.
    Rejected { sql: String, rejection: Rejection },
    Executed { sql: String, result: QueryRows },
    ExecutionFailed { sql: String, error: String },
}

pub struct QueryService<G, X> {
    schema: SchemaHandle,
    generator: G,
    executor: X,
    validator: Validator,
}

impl<G, X> QueryService<G, X>
where
    G: SqlGenerator + Sync,
    X: QueryExecutor + Sync,
{
    pub fn new(schema: SchemaHandle, generator: G, executor: X) -> Self {
        Self {
            schema,
            generator,
            executor,
            validator: Validator::default(),
        }
    }

    /// Current schema snapshot, if one is loaded.
    pub fn schema(&self) -> Option<Arc<SchemaModel>> {
        self.schema.current()
    }

    #[instrument(skip_all)]
    pub async fn query_handle(&self, user_input: &str) -> QueryOutcome {
        let start = Instant::now();
        metrics::counter!(names::QUERIES_TOTAL).increment(1);

        let outcome = self.query_run(user_input).await;

        metrics::histogram!(names::QUERY_LATENCY_SECONDS).record(start.elapsed().as_secs_f64());
        outcome
    }

    async fn query_run(&self, user_input: &str) -> QueryOutcome {
        if let Some(message) = input_incomplete(user_input) {
            debug!("incomplete input: {user_input:?}");
            metrics::counter!(names::QUERIES_INCOMPLETE).increment(1);
            return QueryOutcome::Incomplete { message };
        }

        // prompt and validation see the same snapshot
        let Some(schema) = self.schema.current() else {
            warn!("query received before schema was loaded");
            return QueryOutcome::SchemaUnavailable;
        };

        let prompt = prompt_build(user_input, &schema);
        let generate_start = Instant::now();
        let generated = self.generator.sql_generate(&prompt).await;
        metrics::histogram!(names::GENERATION_LATENCY_SECONDS)
            .record(generate_start.elapsed().as_secs_f64());

        let text = match generated {
            Ok(text) => text,
            Err(report) => {
                error!("sql generation failed: {report}");
                metrics::counter!(names::QUERIES_GENERATION_ERRORS).increment(1);
                return QueryOutcome::GenerationFailed {
                    error: report.current_context().to_string(),
                };
            }
        };

        let sql = sql_clean(&text);
        if let Verdict::Rejected(rejection) = self.validator.validate(&sql, Some(&schema)) {
            info!("rejected generated sql: {rejection}");
            return QueryOutcome::Rejected { sql, rejection };
        }

        let execute_start = Instant::now();
        let executed = self.executor.query_execute(&sql).await;
        metrics::histogram!(names::EXECUTION_LATENCY_SECONDS)
            .record(execute_start.elapsed().as_secs_f64());

        match executed {
            Ok(result) => {
                metrics::counter!(names::QUERIES_EXECUTED).increment(1);
                QueryOutcome::Executed { sql, result }
            }
            Err(report) => {
                error!("query execution failed: {report}");
                metrics::counter!(names::QUERIES_EXECUTION_ERRORS).increment(1);
                QueryOutcome::ExecutionFailed {
                    error: report.current_context().to_string(),
                    sql,
                }
            }
        }
    }
}
