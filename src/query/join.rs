use std::fmt;

use ecow::EcoString;

/// Join condition in canonical, order-independent form.
///
/// All four fields are lower-cased, and the side with the lexicographically
/// smaller table name always comes first, so `a.x = b.y` and `b.y = a.x`
/// compare equal. Self-joins fall back to ordering by column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedJoin {
    pub table_a: EcoString,
    pub column_a: EcoString,
    pub table_b: EcoString,
    pub column_b: EcoString,
}

impl fmt::Display for NormalizedJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.table_a, self.column_a, self.table_b, self.column_b
        )
    }
}

pub fn join_normalize(
    table: &str,
    column: &str,
    foreign_table: &str,
    foreign_column: &str,
) -> NormalizedJoin {
    let table = table.to_lowercase();
    let column = column.to_lowercase();
    let foreign_table = foreign_table.to_lowercase();
    let foreign_column = foreign_column.to_lowercase();

    if (&table, &column) > (&foreign_table, &foreign_column) {
        NormalizedJoin {
            table_a: foreign_table.into(),
            column_a: foreign_column.into(),
            table_b: table.into(),
            column_b: column.into(),
        }
    } else {
        NormalizedJoin {
            table_a: table.into(),
            column_a: column.into(),
            table_b: foreign_table.into(),
            column_b: foreign_column.into(),
        }
    }
}
