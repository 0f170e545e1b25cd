use std::future::Future;

use rootcause::Report;
use serde::Serialize;
use tokio_postgres::{Client, SimpleQueryMessage};
use tracing::instrument;

use crate::result::MapIntoReport;

use super::{PgError, PgResult};

/// Result set rendered as text, the way the simple query protocol returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryRows {
    /// Collect rows from simple query messages; non-row messages are skipped.
    pub fn from_messages(messages: &[SimpleQueryMessage]) -> Self {
        let mut result = QueryRows::default();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_owned()).collect();
                }
                let values = (0..row.len())
                    .map(|i| row.get(i).map(str::to_owned))
                    .collect();
                result.rows.push(values);
            }
        }
        result
    }
}

/// Runs an approved query against the target database.
pub trait QueryExecutor {
    fn query_execute(&self, sql: &str) -> impl Future<Output = PgResult<QueryRows>> + Send;
}

impl QueryExecutor for Client {
    #[instrument(skip_all)]
    async fn query_execute(&self, sql: &str) -> PgResult<QueryRows> {
        if self.is_closed() {
            return Err(Report::new(PgError::ConnectionClosed));
        }
        let messages = self
            .simple_query(sql)
            .await
            .map_into_report::<PgError>()?;
        Ok(QueryRows::from_messages(&messages))
    }
}
