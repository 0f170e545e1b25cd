//! Schema introspection from the PostgreSQL catalog.
//!
//! Reads tables, columns and foreign keys of one schema through
//! `information_schema` and assembles a [`SchemaModel`].

use std::collections::BTreeMap;

use tokio_postgres::{Client, Row};
use tracing::{info, instrument, warn};

use crate::catalog::{ForeignKey, SchemaModel};
use crate::metrics::names;
use crate::result::{MapIntoReport, ReportExt};
use crate::settings::CatalogSettings;

use super::{PgError, PgResult};

/// Load the schema model described by `settings`.
///
/// Returns `Ok(None)` when the catalog is reachable but the schema is not
/// complete enough to validate against (no tables, a table without columns,
/// or no foreign keys).
#[instrument(skip_all)]
pub async fn schema_load(
    client: &Client,
    settings: &CatalogSettings,
) -> PgResult<Option<SchemaModel>> {
    let tables = tables_query(client, settings)
        .await
        .attach_loc("loading tables")?;
    let columns = columns_query(client, &settings.schema)
        .await
        .attach_loc("loading columns")?;
    let relationships = relationships_query(client, &settings.schema)
        .await
        .attach_loc("loading foreign keys")?;

    let schema = SchemaModel::new(tables, columns, relationships);

    if let Err(e) = schema.completeness_check() {
        warn!("schema '{}' incomplete: {e}", settings.schema);
        metrics::counter!(names::SCHEMA_LOAD_INCOMPLETE).increment(1);
        return Ok(None);
    }

    info!(
        "loaded schema '{}': {} tables, {} foreign keys",
        settings.schema,
        schema.tables().count(),
        schema.relationships().count()
    );
    metrics::counter!(names::SCHEMA_LOADS).increment(1);
    metrics::gauge!(names::SCHEMA_TABLES).set(schema.tables().count() as f64);

    Ok(Some(schema))
}

async fn tables_query(client: &Client, settings: &CatalogSettings) -> PgResult<Vec<String>> {
    let sql = r"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = $1
        ORDER BY table_name;
    ";

    let rows = client
        .query(sql, &[&settings.schema])
        .await
        .map_into_report::<PgError>()?;

    Ok(table_names_filter(
        rows.iter().map(|row| row.get::<_, String>(0)),
        settings.exclude_prefix.as_deref(),
    ))
}

async fn columns_query(client: &Client, schema: &str) -> PgResult<Vec<(String, Vec<String>)>> {
    let sql = r"
        SELECT table_name::text, column_name::text
        FROM information_schema.columns
        WHERE table_schema = $1
        ORDER BY table_name, ordinal_position;
    ";

    let rows = client
        .query(sql, &[&schema])
        .await
        .map_into_report::<PgError>()?;

    Ok(columns_group(rows.iter().map(|row| {
        (row.get::<_, String>(0), row.get::<_, String>(1))
    })))
}

async fn relationships_query(client: &Client, schema: &str) -> PgResult<Vec<ForeignKey>> {
    let sql = r"
        SELECT
            tc.table_name::text,
            kcu.column_name::text,
            ccu.table_name::text AS foreign_table_name,
            ccu.column_name::text AS foreign_column_name
        FROM information_schema.table_constraints AS tc
        JOIN information_schema.key_column_usage AS kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage AS ccu
            ON ccu.constraint_name = tc.constraint_name
            AND ccu.constraint_schema = tc.table_schema
        WHERE tc.constraint_type = 'FOREIGN KEY'
        AND tc.table_schema = $1;
    ";

    let rows = client
        .query(sql, &[&schema])
        .await
        .map_into_report::<PgError>()?;

    Ok(rows.iter().map(foreign_key_from_row).collect())
}

fn foreign_key_from_row(row: &Row) -> ForeignKey {
    ForeignKey::new(
        row.get::<_, String>(0),
        row.get::<_, String>(1),
        row.get::<_, String>(2),
        row.get::<_, String>(3),
    )
}

fn table_names_filter(
    names: impl Iterator<Item = String>,
    exclude_prefix: Option<&str>,
) -> Vec<String> {
    names
        .filter(|name| exclude_prefix.is_none_or(|prefix| !name.starts_with(prefix)))
        .collect()
}

/// Group `(table, column)` rows into per-table column lists, keeping row order.
fn columns_group(rows: impl Iterator<Item = (String, String)>) -> Vec<(String, Vec<String>)> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (table, column) in rows {
        grouped.entry(table).or_default().push(column);
    }
    grouped.into_iter().collect()
}
