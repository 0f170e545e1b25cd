pub mod connect;
pub mod execute;
pub mod introspect;

use error_set::error_set;
use rootcause::Report;

pub use connect::{config_build, connect};
pub use execute::{QueryExecutor, QueryRows};
pub use introspect::schema_load;

error_set! {
    PgError = {
        #[display("{context} connection failed: {error}")]
        Connect { context: String, error: tokio_postgres::Error },
        Query(tokio_postgres::Error),
        #[display("Connection to the database is closed")]
        ConnectionClosed,
    };
}

/// Result type with location-tracking error reports for database operations.
pub type PgResult<T> = Result<T, Report<PgError>>;
