use std::fmt::Write;

use crate::catalog::SchemaModel;

/// Reply sent instead of generating when the request is too short.
pub const INCOMPLETE_MESSAGE: &str = "Your query seems incomplete. Please provide more details.";

const MIN_WORDS: usize = 3;

/// Returns the reply for input too short to generate from.
pub fn input_incomplete(text: &str) -> Option<&'static str> {
    (text.split_whitespace().count() < MIN_WORDS).then_some(INCOMPLETE_MESSAGE)
}

/// Builds the generation prompt from the request and the current schema.
pub fn prompt_build(user_input: &str, schema: &SchemaModel) -> String {
    let summary = schema.summary();
    let tables = summary
        .tables
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut columns = String::new();
    for (table, names) in &summary.columns {
        let names = names.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
        let _ = write!(columns, "\n      {table}: {names}");
    }

    let mut relationships = String::new();
    for fk in &summary.relationships {
        let _ = write!(
            relationships,
            "\n      {}.{} -> {}.{}",
            fk.table, fk.column, fk.foreign_table, fk.foreign_column
        );
    }

    format!(
        r#"Generate an SQL query based on the user's input for the Pagila database.

### Schema Rules:
- Use only these tables: {tables}
- Ensure correct column names:{columns}
- 'release_year' is an INTEGER (do not use EXTRACT())
- 'rental_date' is a TIMESTAMP (use proper date functions)
- 'actor_name' should be UPPERCASE
- Join tables correctly based on foreign key relationships:{relationships}

User Query: "{user_input}"
If the input is ambiguous, provide clarification. Return ONLY the SQL query.
"#
    )
}

#[cfg(test)]
mod tests {
    use crate::catalog::ForeignKey;

    use super::*;

    #[test]
    fn test_input_incomplete() {
        assert_eq!(input_incomplete("films"), Some(INCOMPLETE_MESSAGE));
        assert_eq!(input_incomplete("  list   films  "), Some(INCOMPLETE_MESSAGE));
        assert_eq!(input_incomplete(""), Some(INCOMPLETE_MESSAGE));
        assert_eq!(input_incomplete("list all films"), None);
    }

    #[test]
    fn test_prompt_build_lists_schema() {
        let schema = SchemaModel::new(
            ["film", "film_actor"],
            [
                ("film", vec!["film_id", "title"]),
                ("film_actor", vec!["film_id", "actor_id"]),
            ],
            [ForeignKey::new("film_actor", "film_id", "film", "film_id")],
        );

        let prompt = prompt_build("list all films", &schema);
        assert!(prompt.contains("Use only these tables: film, film_actor"));
        assert!(prompt.contains("film: film_id, title"));
        assert!(prompt.contains("film_actor.film_id -> film.film_id"));
        assert!(prompt.contains("User Query: \"list all films\""));
        assert!(prompt.contains("Return ONLY the SQL query."));
    }
}
