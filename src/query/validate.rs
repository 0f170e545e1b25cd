//! Schema-aware validation of generated SQL.
//!
//! Checks run cheapest first and stop at the first failure:
//! 1. every FROM/JOIN table exists in the schema
//! 2. every `alias.column` reference resolves to a known table and column
//! 3. every bare select-list column belongs to one of the query's tables
//! 4. every `a.x = b.y` condition matches a foreign key, in either direction
//!
//! Validation is a pure function of the SQL text and the schema. It never
//! rewrites the query: an approved verdict carries the input string unchanged.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::catalog::SchemaModel;
use crate::metrics::names;

use super::alias::{AliasMap, alias_map_build};
use super::extract::{ColumnRef, PatternExtractor, ReferenceExtractor};
use super::join::{NormalizedJoin, join_normalize};

/// Category of a rejected query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectKind {
    InvalidTable,
    InvalidAlias,
    InvalidColumn,
    InvalidJoin,
    SchemaUnavailable,
}

impl RejectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectKind::InvalidTable => "InvalidTable",
            RejectKind::InvalidAlias => "InvalidAlias",
            RejectKind::InvalidColumn => "InvalidColumn",
            RejectKind::InvalidJoin => "InvalidJoin",
            RejectKind::SchemaUnavailable => "SchemaUnavailable",
        }
    }
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a query was rejected: the kind plus the offending identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub kind: RejectKind,
    pub detail: String,
}

impl Rejection {
    pub fn new(kind: RejectKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RejectKind::InvalidTable => write!(f, "Invalid table: {}", self.detail),
            RejectKind::InvalidAlias => write!(f, "Invalid alias: {}", self.detail),
            RejectKind::InvalidColumn => write!(f, "Invalid column: {}", self.detail),
            RejectKind::InvalidJoin => write!(f, "Invalid relationship: {}", self.detail),
            RejectKind::SchemaUnavailable => {
                write!(f, "Schema unavailable: {}", self.detail)
            }
        }
    }
}

/// Outcome of validating one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<'q> {
    Approved(&'q str),
    Rejected(Rejection),
}

impl<'q> Verdict<'q> {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved(_))
    }

    /// The approved query, or the rejection.
    pub fn into_result(self) -> Result<&'q str, Rejection> {
        match self {
            Verdict::Approved(sql) => Ok(sql),
            Verdict::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Validates queries using a [`ReferenceExtractor`].
#[derive(Debug, Clone, Default)]
pub struct Validator<E = PatternExtractor> {
    extractor: E,
}

impl<E: ReferenceExtractor> Validator<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Validate `sql` against `schema`.
    ///
    /// A missing or empty schema rejects with `SchemaUnavailable` before any
    /// reference is examined.
    #[instrument(skip_all)]
    pub fn validate<'q>(&self, sql: &'q str, schema: Option<&SchemaModel>) -> Verdict<'q> {
        let verdict = match schema {
            Some(schema) if !schema.is_empty() => match self.references_check(sql, schema) {
                Ok(()) => Verdict::Approved(sql),
                Err(rejection) => Verdict::Rejected(rejection),
            },
            Some(_) => Verdict::Rejected(Rejection::new(
                RejectKind::SchemaUnavailable,
                "schema has no tables",
            )),
            None => Verdict::Rejected(Rejection::new(
                RejectKind::SchemaUnavailable,
                "schema not loaded",
            )),
        };

        match &verdict {
            Verdict::Approved(_) => {
                metrics::counter!(names::VALIDATION_APPROVED).increment(1);
            }
            Verdict::Rejected(rejection) => {
                debug!("query rejected: {rejection}");
                metrics::counter!(names::VALIDATION_REJECTED, "kind" => rejection.kind.as_str())
                    .increment(1);
            }
        }

        verdict
    }

    fn references_check(&self, sql: &str, schema: &SchemaModel) -> Result<(), Rejection> {
        tables_check(&self.extractor.tables(sql), schema)?;

        let aliases = alias_map_build(&self.extractor, sql);
        columns_check(&self.extractor.column_refs(sql), &aliases, schema)?;
        select_columns_check(&self.extractor.select_columns(sql), &aliases, schema)?;

        let joins = self
            .extractor
            .join_refs(sql)
            .into_iter()
            .map(|join| {
                let left = alias_resolve(&aliases, &join.left.qualifier)?;
                let right = alias_resolve(&aliases, &join.right.qualifier)?;
                Ok(join_normalize(
                    left,
                    &join.left.column,
                    right,
                    &join.right.column,
                ))
            })
            .collect::<Result<Vec<_>, Rejection>>()?;
        joins_check(&joins, schema)
    }
}

/// Validate with the default pattern extractor.
pub fn query_validate<'q>(sql: &'q str, schema: Option<&SchemaModel>) -> Verdict<'q> {
    Validator::<PatternExtractor>::default().validate(sql, schema)
}

fn tables_check(tables: &[String], schema: &SchemaModel) -> Result<(), Rejection> {
    match tables.iter().find(|table| !schema.table_exists(table)) {
        Some(table) => Err(Rejection::new(RejectKind::InvalidTable, table.as_str())),
        None => Ok(()),
    }
}

fn alias_resolve<'a>(aliases: &'a AliasMap, alias: &str) -> Result<&'a str, Rejection> {
    aliases
        .resolve(alias)
        .ok_or_else(|| Rejection::new(RejectKind::InvalidAlias, alias))
}

fn columns_check(
    columns: &[ColumnRef],
    aliases: &AliasMap,
    schema: &SchemaModel,
) -> Result<(), Rejection> {
    for column_ref in columns {
        let table = alias_resolve(aliases, &column_ref.qualifier)?;

        let Some(table_columns) = schema.table_columns(table) else {
            return Err(Rejection::new(RejectKind::InvalidTable, table));
        };

        if !table_columns.column_exists(&column_ref.column) {
            return Err(Rejection::new(
                RejectKind::InvalidColumn,
                format!("{}.{}", column_ref.qualifier, column_ref.column),
            ));
        }
    }

    Ok(())
}

/// Unqualified select-list columns must belong to one of the query's tables.
fn select_columns_check(
    columns: &[String],
    aliases: &AliasMap,
    schema: &SchemaModel,
) -> Result<(), Rejection> {
    let tables = aliases.tables();

    for column in columns {
        let found = tables.iter().any(|table| {
            schema
                .table_columns(table)
                .is_some_and(|t| t.column_exists(column))
        });

        if !found {
            let detail = match tables.first() {
                Some(table) if tables.len() == 1 => format!("{table}.{column}"),
                _ => column.clone(),
            };
            return Err(Rejection::new(RejectKind::InvalidColumn, detail));
        }
    }

    Ok(())
}

fn joins_check(joins: &[NormalizedJoin], schema: &SchemaModel) -> Result<(), Rejection> {
    match joins.iter().find(|join| !schema.relationship_exists(join)) {
        Some(join) => Err(Rejection::new(RejectKind::InvalidJoin, join.to_string())),
        None => Ok(()),
    }
}
