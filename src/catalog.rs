//! Database schema model used to validate generated queries.
//!
//! A [`SchemaModel`] is built once from catalog introspection and never
//! mutated afterwards. All lookups are case-insensitive: lower-cased keys are
//! computed at construction so validation does no folding of schema names.
//!
//! The current model is shared through a [`SchemaUpdater`] / [`SchemaHandle`]
//! pair. A refresh swaps in a whole new model, so concurrent readers see
//! either the old or the new schema, never a mix.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ecow::EcoString;
use error_set::error_set;
use iddqd::{IdHashItem, IdHashMap, id_upcast};
use serde::Serialize;
use tokio::sync::watch;

use crate::query::join::{NormalizedJoin, join_normalize};

error_set! {
    SchemaError = {
        #[display("No tables found in the schema")]
        NoTables,
        #[display("Table '{table}' has no columns")]
        EmptyTable { table: String },
        #[display("No foreign key relationships found")]
        NoRelationships,
    };
}

/// One direction of a foreign-key edge: `table.column -> foreign_table.foreign_column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKey {
    pub table: EcoString,
    pub column: EcoString,
    pub foreign_table: EcoString,
    pub foreign_column: EcoString,
}

impl ForeignKey {
    pub fn new(
        table: impl Into<EcoString>,
        column: impl Into<EcoString>,
        foreign_table: impl Into<EcoString>,
        foreign_column: impl Into<EcoString>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            foreign_table: foreign_table.into(),
            foreign_column: foreign_column.into(),
        }
    }

    pub fn normalized(&self) -> NormalizedJoin {
        join_normalize(
            &self.table,
            &self.column,
            &self.foreign_table,
            &self.foreign_column,
        )
    }
}

impl IdHashItem for ForeignKey {
    type Key<'a> = (&'a str, &'a str);

    fn key(&self) -> Self::Key<'_> {
        (self.table.as_str(), self.column.as_str())
    }

    id_upcast!();
}

/// Columns of a single table, in catalog order.
#[derive(Debug, Clone)]
pub struct TableColumns {
    /// Table name as reported by the catalog
    pub name: EcoString,
    /// Column names as reported by the catalog
    pub columns: Vec<EcoString>,
    key: String,
    column_keys: HashSet<String>,
}

impl TableColumns {
    fn new(name: EcoString, columns: Vec<EcoString>) -> Self {
        let key = name.as_str().to_lowercase();
        let column_keys = columns.iter().map(|c| c.as_str().to_lowercase()).collect();
        Self {
            name,
            columns,
            key,
            column_keys,
        }
    }

    /// Case-insensitive column membership.
    pub fn column_exists(&self, column: &str) -> bool {
        self.column_keys.contains(&column.to_lowercase())
    }
}

impl IdHashItem for TableColumns {
    type Key<'a> = &'a str;

    fn key(&self) -> Self::Key<'_> {
        self.key.as_str()
    }

    id_upcast!();
}

/// Tables, per-table columns and foreign keys of the target database.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    tables: Vec<EcoString>,
    table_keys: HashSet<String>,
    columns: IdHashMap<TableColumns>,
    relationships: IdHashMap<ForeignKey>,
    relationship_keys: HashSet<NormalizedJoin>,
}

impl SchemaModel {
    /// Build a model from raw catalog data.
    ///
    /// Column lists for the same table are merged. A later foreign key for the
    /// same `(table, column)` replaces an earlier one.
    pub fn new<T, C>(
        tables: impl IntoIterator<Item = T>,
        columns: impl IntoIterator<Item = (T, Vec<C>)>,
        relationships: impl IntoIterator<Item = ForeignKey>,
    ) -> Self
    where
        T: Into<EcoString>,
        C: Into<EcoString>,
    {
        let mut table_list: Vec<EcoString> = Vec::new();
        let mut table_keys = HashSet::new();
        for table in tables {
            let table = table.into();
            if table_keys.insert(table.as_str().to_lowercase()) {
                table_list.push(table);
            }
        }

        let mut column_map: IdHashMap<TableColumns> = IdHashMap::new();
        for (table, cols) in columns {
            let table = table.into();
            let mut cols: Vec<EcoString> = cols.into_iter().map(Into::into).collect();
            if let Some(existing) = column_map.get(table.as_str().to_lowercase().as_str()) {
                let mut merged = existing.columns.clone();
                merged.append(&mut cols);
                cols = merged;
            }
            column_map.insert_overwrite(TableColumns::new(table, cols));
        }

        let mut relationship_map: IdHashMap<ForeignKey> = IdHashMap::new();
        for fk in relationships {
            relationship_map.insert_overwrite(fk);
        }
        let relationship_keys = relationship_map.iter().map(ForeignKey::normalized).collect();

        Self {
            tables: table_list,
            table_keys,
            columns: column_map,
            relationships: relationship_map,
            relationship_keys,
        }
    }

    /// Check the model is complete enough to validate against.
    ///
    /// Fails when there are no tables, when a table has no columns, or when
    /// there are no foreign keys at all.
    pub fn completeness_check(&self) -> Result<(), SchemaError> {
        if self.tables.is_empty() {
            return Err(SchemaError::NoTables);
        }

        for table in &self.tables {
            let has_columns = self
                .table_columns(table)
                .is_some_and(|t| !t.columns.is_empty());
            if !has_columns {
                return Err(SchemaError::EmptyTable {
                    table: table.to_string(),
                });
            }
        }

        if self.relationships.is_empty() {
            return Err(SchemaError::NoRelationships);
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Case-insensitive table membership.
    pub fn table_exists(&self, table: &str) -> bool {
        self.table_keys.contains(&table.to_lowercase())
    }

    /// Column set of a table, looked up case-insensitively.
    pub fn table_columns(&self, table: &str) -> Option<&TableColumns> {
        self.columns.get(table.to_lowercase().as_str())
    }

    /// Whether a normalized join matches a known foreign key, in either direction.
    pub fn relationship_exists(&self, join: &NormalizedJoin) -> bool {
        self.relationship_keys.contains(join)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(EcoString::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &TableColumns> {
        self.columns.iter()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &ForeignKey> {
        self.relationships.iter()
    }

    /// Sorted, serializable view of the model.
    pub fn summary(&self) -> SchemaSummary {
        let mut relationships: Vec<ForeignKey> = self.relationships.iter().cloned().collect();
        relationships.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));

        SchemaSummary {
            tables: self.tables.clone(),
            columns: self
                .columns
                .iter()
                .map(|t| (t.name.clone(), t.columns.clone()))
                .collect(),
            relationships,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaSummary {
    pub tables: Vec<EcoString>,
    pub columns: BTreeMap<EcoString, Vec<EcoString>>,
    pub relationships: Vec<ForeignKey>,
}

/// Read side of the shared schema. Cheap to clone, one per consumer.
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    rx: watch::Receiver<Option<Arc<SchemaModel>>>,
}

impl SchemaHandle {
    /// Snapshot of the current schema, or `None` if none has been loaded.
    pub fn current(&self) -> Option<Arc<SchemaModel>> {
        self.rx.borrow().clone()
    }
}

/// Write side of the shared schema, owned by whoever loads it.
#[derive(Debug)]
pub struct SchemaUpdater {
    tx: watch::Sender<Option<Arc<SchemaModel>>>,
}

impl SchemaUpdater {
    /// Creates an updater with no schema loaded, and its first handle.
    pub fn new() -> (Self, SchemaHandle) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, SchemaHandle { rx })
    }

    /// Replaces the schema seen by all handles.
    pub fn schema_update(&self, schema: SchemaModel) {
        // send_replace stores the value even when no handle is alive
        self.tx.send_replace(Some(Arc::new(schema)));
    }

    /// Marks the schema unavailable.
    pub fn schema_clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn handle_subscribe(&self) -> SchemaHandle {
        SchemaHandle {
            rx: self.tx.subscribe(),
        }
    }
}
