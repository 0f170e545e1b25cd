//! Lexical reference extraction from SQL text.
//!
//! Extraction is pattern based and case-insensitive. It does not build a
//! syntax tree: it over-matches rather than under-matches, so any extra
//! references it picks up only make validation stricter.
//!
//! The validator only talks to the [`ReferenceExtractor`] trait, so a
//! parser-backed extractor can be dropped in without touching it.

use std::collections::HashSet;
use std::hash::Hash;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `qualifier.column` occurrence, where the qualifier is an alias or table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            column: column.into(),
        }
    }
}

/// `a.b = c.d` occurrence, with both sides still unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinRef {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// Table token following FROM/JOIN, with the alias token that follows it (if any).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAliasRef {
    pub table: String,
    pub alias: Option<String>,
}

/// Source of raw table, column and join references in a SQL string.
///
/// All returned collections are de-duplicated and keep the order of first
/// appearance in the text.
pub trait ReferenceExtractor {
    /// Identifiers immediately following FROM or JOIN, plus every further
    /// table of a comma-separated FROM list, case preserved.
    fn tables(&self, sql: &str) -> Vec<String>;

    /// Every `identifier.identifier` occurrence anywhere in the text.
    fn column_refs(&self, sql: &str) -> Vec<ColumnRef>;

    /// Every `a.b = c.d` occurrence.
    fn join_refs(&self, sql: &str) -> Vec<JoinRef>;

    /// Every FROM/JOIN table together with its explicit or implicit alias.
    fn table_aliases(&self, sql: &str) -> Vec<TableAliasRef>;

    /// Unqualified column names listed as plain items of the outermost SELECT.
    ///
    /// Expressions, function calls, `*` and qualified names are not returned.
    /// Nothing is returned when the query reads from a subquery in FROM/JOIN,
    /// because the columns it exposes are not schema columns.
    fn select_columns(&self, _sql: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Tokens that can follow a table name without being an alias.
const CLAUSE_KEYWORDS: &[&str] = &[
    "on",
    "using",
    "where",
    "join",
    "inner",
    "left",
    "right",
    "full",
    "outer",
    "cross",
    "natural",
    "group",
    "order",
    "having",
    "limit",
    "offset",
    "union",
    "intersect",
    "except",
    "window",
    "fetch",
    "for",
    "returning",
    "set",
    "values",
    "lateral",
];

#[allow(clippy::expect_used)]
static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([a-zA-Z_][a-zA-Z0-9_]*)\b").expect("table pattern")
});

// Comma-separated FROM list of plain tables: `FROM a [AS] x, b y, c`.
#[allow(clippy::expect_used)]
static FROM_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bFROM\s+[a-zA-Z_][a-zA-Z0-9_]*(?:\s+(?:AS\s+)?[a-zA-Z_][a-zA-Z0-9_]*)?(?:\s*,\s*[a-zA-Z_][a-zA-Z0-9_]*(?:\s+(?:AS\s+)?[a-zA-Z_][a-zA-Z0-9_]*)?)+",
    )
    .expect("from list pattern")
});

// Table token after each comma inside a FROM_LIST_RE match.
#[allow(clippy::expect_used)]
static FROM_LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\s*([a-zA-Z_][a-zA-Z0-9_]*)").expect("from list item pattern")
});

#[allow(clippy::expect_used)]
static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\.([a-zA-Z_][a-zA-Z0-9_]*)\b").expect("column pattern")
});

#[allow(clippy::expect_used)]
static JOIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([a-zA-Z_][a-zA-Z0-9_]*)\.([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*([a-zA-Z_][a-zA-Z0-9_]*)\.([a-zA-Z_][a-zA-Z0-9_]*)\b",
    )
    .expect("join pattern")
});

// Matched against the text right after a FROM/JOIN table token. Kept separate from
// TABLE_RE so a keyword that is not an alias (e.g. a following JOIN) is not consumed.
#[allow(clippy::expect_used)]
static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s+(?:(AS)\s+)?([a-zA-Z_][a-zA-Z0-9_]*)\b").expect("alias pattern")
});

/// Bare identifiers in a select list that are values, not columns.
const VALUE_KEYWORDS: &[&str] = &[
    "null",
    "true",
    "false",
    "current_date",
    "current_time",
    "current_timestamp",
    "localtime",
    "localtimestamp",
    "current_user",
    "session_user",
    "user",
];

#[allow(clippy::expect_used)]
static SELECT_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+(?:(?:DISTINCT|ALL)\s+)?(.*?)\s+FROM\b")
        .expect("select list pattern")
});

#[allow(clippy::expect_used)]
static BARE_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-zA-Z_][a-zA-Z0-9_]*)(?:\s+(?:AS\s+)?[a-zA-Z_][a-zA-Z0-9_]*)?$")
        .expect("bare column pattern")
});

// A subquery used as a relation; its output columns are not schema columns.
#[allow(clippy::expect_used)]
static DERIVED_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+(?:LATERAL\s+)?\(").expect("derived table pattern")
});

/// Regex-backed [`ReferenceExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl ReferenceExtractor for PatternExtractor {
    fn tables(&self, sql: &str) -> Vec<String> {
        unique_collect(
            table_spans(sql)
                .into_iter()
                .filter_map(|span| sql.get(span))
                .map(str::to_owned),
        )
    }

    fn column_refs(&self, sql: &str) -> Vec<ColumnRef> {
        unique_collect(COLUMN_RE.captures_iter(sql).map(|caps| {
            let (_, [qualifier, column]) = caps.extract();
            ColumnRef::new(qualifier, column)
        }))
    }

    fn join_refs(&self, sql: &str) -> Vec<JoinRef> {
        unique_collect(JOIN_RE.captures_iter(sql).map(|caps| {
            let (_, [table, column, foreign_table, foreign_column]) = caps.extract();
            JoinRef {
                left: ColumnRef::new(table, column),
                right: ColumnRef::new(foreign_table, foreign_column),
            }
        }))
    }

    fn table_aliases(&self, sql: &str) -> Vec<TableAliasRef> {
        table_spans(sql)
            .into_iter()
            .filter_map(|span| {
                let rest = sql.get(span.end..).unwrap_or_default();
                Some(TableAliasRef {
                    table: sql.get(span)?.to_owned(),
                    alias: alias_token_find(rest),
                })
            })
            .collect()
    }

    fn select_columns(&self, sql: &str) -> Vec<String> {
        if DERIVED_TABLE_RE.is_match(sql) {
            return Vec::new();
        }

        let Some(list) = SELECT_LIST_RE.captures(sql).and_then(|caps| caps.get(1)) else {
            return Vec::new();
        };

        unique_collect(
            select_items_split(list.as_str())
                .into_iter()
                .filter_map(|item| BARE_COLUMN_RE.captures(item.trim()))
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|name| {
                    !VALUE_KEYWORDS
                        .iter()
                        .any(|keyword| keyword.eq_ignore_ascii_case(name))
                })
                .map(str::to_owned),
        )
    }
}

/// Byte ranges of every table token, in text order: the first table after each
/// FROM/JOIN and every further table of a comma-separated FROM list.
fn table_spans(sql: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = TABLE_RE
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.range())
        .collect();

    for list in FROM_LIST_RE.find_iter(sql) {
        spans.extend(
            FROM_LIST_ITEM_RE
                .captures_iter(list.as_str())
                .filter_map(|caps| caps.get(1))
                .map(|m| list.start() + m.start()..list.start() + m.end()),
        );
    }

    spans.sort_by_key(|span| span.start);
    spans
}

/// Split a select list on commas that are not inside parentheses.
fn select_items_split(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.extend(list.get(start..i));
                start = i + 1;
            }
            _ => {}
        }
    }
    items.extend(list.get(start..));

    items
}

/// Find the alias token at the start of `rest`, the text following a table name.
///
/// `AS <ident>` is always an alias; a bare identifier is an alias unless it is
/// a clause keyword such as ON or WHERE.
fn alias_token_find(rest: &str) -> Option<String> {
    let caps = ALIAS_RE.captures(rest)?;
    let token = caps.get(2)?.as_str();
    let explicit = caps.get(1).is_some();

    if !explicit && keyword_is_clause(token) {
        return None;
    }

    Some(token.to_owned())
}

fn keyword_is_clause(token: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(token))
}

fn unique_collect<T: Clone + Eq + Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_patterns_compile() {
        for pattern in [
            &TABLE_RE,
            &FROM_LIST_RE,
            &FROM_LIST_ITEM_RE,
            &COLUMN_RE,
            &JOIN_RE,
            &ALIAS_RE,
            &SELECT_LIST_RE,
            &BARE_COLUMN_RE,
            &DERIVED_TABLE_RE,
        ] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
    }

    #[test]
    fn test_tables_from_and_join() {
        let sql = "SELECT * FROM rental r JOIN inventory i ON r.inventory_id = i.inventory_id \
                   left join Film f on i.film_id = f.film_id";
        assert_eq!(
            PatternExtractor.tables(sql),
            vec!["rental".to_owned(), "inventory".to_owned(), "Film".to_owned()]
        );
    }

    #[test]
    fn test_tables_none() {
        assert!(PatternExtractor.tables("SELECT 1").is_empty());
        assert!(PatternExtractor.tables("").is_empty());
    }

    #[test]
    fn test_tables_deduplicated() {
        let sql = "SELECT * FROM actor WHERE actor_id IN (SELECT actor_id FROM actor)";
        assert_eq!(PatternExtractor.tables(sql), vec!["actor".to_owned()]);
    }

    #[test]
    fn test_tables_subquery_in_from_skipped() {
        let sql = "SELECT x.title FROM (SELECT title FROM film) x";
        assert_eq!(PatternExtractor.tables(sql), vec!["film".to_owned()]);
    }

    #[test]
    fn test_column_refs() {
        let sql = "SELECT a.first_name, a.last_name FROM actor a WHERE a.actor_id = 1";
        assert_eq!(
            PatternExtractor.column_refs(sql),
            vec![
                ColumnRef::new("a", "first_name"),
                ColumnRef::new("a", "last_name"),
                ColumnRef::new("a", "actor_id"),
            ]
        );
    }

    #[test]
    fn test_column_refs_ignore_numbers() {
        let sql = "SELECT title FROM film WHERE rental_rate > 2.99";
        assert!(PatternExtractor.column_refs(sql).is_empty());
    }

    #[test]
    fn test_join_refs() {
        let sql = "SELECT * FROM rental r JOIN inventory i ON r.inventory_id=i.inventory_id";
        assert_eq!(
            PatternExtractor.join_refs(sql),
            vec![JoinRef {
                left: ColumnRef::new("r", "inventory_id"),
                right: ColumnRef::new("i", "inventory_id"),
            }]
        );
    }

    #[test]
    fn test_join_refs_whitespace_around_equals() {
        let sql = "SELECT * FROM film JOIN language ON film.language_id\n   =  language.language_id";
        let joins = PatternExtractor.join_refs(sql);
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].right, ColumnRef::new("language", "language_id"));
    }

    #[test]
    fn test_table_aliases_explicit_and_implicit() {
        let sql = "SELECT * FROM actor AS a JOIN film_actor fa ON a.actor_id = fa.actor_id";
        assert_eq!(
            PatternExtractor.table_aliases(sql),
            vec![
                TableAliasRef {
                    table: "actor".to_owned(),
                    alias: Some("a".to_owned()),
                },
                TableAliasRef {
                    table: "film_actor".to_owned(),
                    alias: Some("fa".to_owned()),
                },
            ]
        );
    }

    #[test]
    fn test_table_aliases_on_is_not_alias() {
        let sql = "SELECT * FROM rental\nJOIN inventory\nON rental.inventory_id = inventory.inventory_id";
        let aliases = PatternExtractor.table_aliases(sql);
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[0].alias, None);
        assert_eq!(aliases[1].alias, None);
    }

    #[test]
    fn test_table_aliases_keyword_not_consumed() {
        // the JOIN after `film` must still be seen as a JOIN
        let sql = "SELECT * FROM film JOIN language ON film.language_id = language.language_id";
        let aliases = PatternExtractor.table_aliases(sql);
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[1].table, "language");
    }

    #[test]
    fn test_select_columns_plain_items() {
        let sql = "SELECT DISTINCT title, release_year AS year, f.rating, count(*), \
                   coalesce(a, b) total, NULL FROM film f";
        assert_eq!(
            PatternExtractor.select_columns(sql),
            vec!["title".to_owned(), "release_year".to_owned()]
        );
    }

    #[test]
    fn test_select_columns_star_and_no_from() {
        assert!(PatternExtractor.select_columns("SELECT * FROM film").is_empty());
        assert!(PatternExtractor.select_columns("SELECT 1").is_empty());
    }

    #[test]
    fn test_select_columns_multiline() {
        let sql = "select\n  titlex\nfrom film";
        assert_eq!(PatternExtractor.select_columns(sql), vec!["titlex".to_owned()]);
    }

    #[test]
    fn test_select_columns_all_quantifier() {
        assert_eq!(
            PatternExtractor.select_columns("SELECT ALL title FROM film"),
            vec!["title".to_owned()]
        );
    }

    #[test]
    fn test_select_columns_derived_table() {
        let sql = "SELECT total FROM (SELECT COUNT(*) AS total FROM film) t";
        assert!(PatternExtractor.select_columns(sql).is_empty());

        let sql = "SELECT f.title, n FROM film f JOIN LATERAL (SELECT 1 AS n) x ON true";
        assert!(PatternExtractor.select_columns(sql).is_empty());
    }

    #[test]
    fn test_tables_comma_separated_from() {
        let sql = "SELECT title FROM film f, director d, actor WHERE f.film_id = d.film_id";
        assert_eq!(
            PatternExtractor.tables(sql),
            vec!["film".to_owned(), "director".to_owned(), "actor".to_owned()]
        );
    }

    #[test]
    fn test_table_aliases_comma_separated_from() {
        let sql = "SELECT f.title FROM film AS f, film_actor fa JOIN actor a \
                   ON fa.actor_id = a.actor_id WHERE f.film_id = fa.film_id";
        let aliases = PatternExtractor.table_aliases(sql);
        assert_eq!(
            aliases
                .iter()
                .map(|alias| (alias.table.as_str(), alias.alias.as_deref()))
                .collect::<Vec<_>>(),
            vec![
                ("film", Some("f")),
                ("film_actor", Some("fa")),
                ("actor", Some("a")),
            ]
        );
    }

    #[test]
    fn test_tables_comma_in_select_list_ignored() {
        let sql = "SELECT title, release_year FROM film ORDER BY title, release_year";
        assert_eq!(PatternExtractor.tables(sql), vec!["film".to_owned()]);
    }

    #[test]
    fn test_table_aliases_where_clause() {
        let aliases = PatternExtractor.table_aliases("SELECT film.title FROM film WHERE film.film_id = 1");
        assert_eq!(
            aliases,
            vec![TableAliasRef {
                table: "film".to_owned(),
                alias: None,
            }]
        );
    }
}
