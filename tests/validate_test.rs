use sqlgate_lib::catalog::{ForeignKey, SchemaModel};
use sqlgate_lib::query::{RejectKind, Rejection, Validator, Verdict, query_validate};

/// A slice of the pagila sample database.
fn pagila() -> SchemaModel {
    SchemaModel::new(
        ["actor", "film", "film_actor", "inventory", "rental", "customer"],
        [
            ("actor", vec!["actor_id", "first_name", "last_name", "last_update"]),
            (
                "film",
                vec!["film_id", "title", "description", "release_year", "rental_rate"],
            ),
            ("film_actor", vec!["actor_id", "film_id", "last_update"]),
            ("inventory", vec!["inventory_id", "film_id", "store_id"]),
            (
                "rental",
                vec!["rental_id", "rental_date", "inventory_id", "customer_id"],
            ),
            ("customer", vec!["customer_id", "first_name", "last_name", "email"]),
        ],
        [
            ForeignKey::new("film_actor", "actor_id", "actor", "actor_id"),
            ForeignKey::new("film_actor", "film_id", "film", "film_id"),
            ForeignKey::new("inventory", "film_id", "film", "film_id"),
            ForeignKey::new("rental", "inventory_id", "inventory", "inventory_id"),
            ForeignKey::new("rental", "customer_id", "customer", "customer_id"),
        ],
    )
}

fn rejection(sql: &str, schema: &SchemaModel) -> Rejection {
    match query_validate(sql, Some(schema)) {
        Verdict::Rejected(rejection) => rejection,
        Verdict::Approved(_) => panic!("expected rejection for {sql}"),
    }
}

#[test]
fn test_generated_queries_approved() {
    let schema = pagila();
    let queries = [
        "SELECT title, release_year FROM film WHERE release_year = 2006",
        "SELECT UPPER(a.first_name), a.last_name FROM actor AS a ORDER BY a.last_name",
        r"SELECT f.title, COUNT(r.rental_id) AS rentals
        FROM film f
        JOIN inventory i ON f.film_id = i.film_id
        JOIN rental r ON r.inventory_id = i.inventory_id
        GROUP BY f.title
        ORDER BY rentals DESC
        LIMIT 10;",
        r"SELECT a.first_name, a.last_name
        FROM actor a
        JOIN film_actor fa
        ON a.actor_id = fa.actor_id
        JOIN film f
        ON fa.film_id = f.film_id
        WHERE f.title = 'ACADEMY DINOSAUR'",
        "SELECT c.email FROM customer c JOIN rental r ON c.customer_id = r.customer_id \
         WHERE r.rental_date >= NOW() - INTERVAL '30 days'",
        "SELECT * FROM FILM WHERE Film.Title ILIKE '%dinosaur%'",
    ];

    for sql in queries {
        assert_eq!(query_validate(sql, Some(&schema)), Verdict::Approved(sql), "{sql}");
    }
}

#[test]
fn test_table_case_insensitive() {
    let schema = pagila();
    for sql in [
        "SELECT first_name FROM actor",
        "SELECT first_name FROM Actor",
        "SELECT first_name FROM ACTOR",
    ] {
        assert!(query_validate(sql, Some(&schema)).is_approved(), "{sql}");
    }
}

#[test]
fn test_unknown_table() {
    let rejection = rejection(
        "SELECT d.name FROM director d JOIN film f ON f.film_id = d.film_id",
        &pagila(),
    );
    assert_eq!(rejection.kind, RejectKind::InvalidTable);
    assert_eq!(rejection.detail, "director");
}

#[test]
fn test_unknown_qualified_column() {
    let rejection = rejection("SELECT a.middle_name FROM actor a", &pagila());
    assert_eq!(rejection.kind, RejectKind::InvalidColumn);
    assert_eq!(rejection.detail, "a.middle_name");
}

#[test]
fn test_column_on_wrong_table() {
    let rejection = rejection(
        "SELECT f.first_name FROM film f JOIN film_actor fa ON f.film_id = fa.film_id",
        &pagila(),
    );
    assert_eq!(rejection.kind, RejectKind::InvalidColumn);
    assert_eq!(rejection.detail, "f.first_name");
}

#[test]
fn test_undeclared_alias() {
    let rejection = rejection("SELECT x.title FROM film f", &pagila());
    assert_eq!(rejection.kind, RejectKind::InvalidAlias);
    assert_eq!(rejection.detail, "x");
}

#[test]
fn test_join_symmetric() {
    let schema = pagila();
    let forward = "SELECT r.rental_date FROM rental r \
                   JOIN inventory i ON r.inventory_id = i.inventory_id";
    let backward = "SELECT r.rental_date FROM rental r \
                    JOIN inventory i ON i.inventory_id = r.inventory_id";
    assert!(query_validate(forward, Some(&schema)).is_approved());
    assert!(query_validate(backward, Some(&schema)).is_approved());
}

#[test]
fn test_join_without_relationship() {
    let rejection = rejection(
        "SELECT a.first_name FROM actor a JOIN customer c ON a.first_name = c.first_name",
        &pagila(),
    );
    assert_eq!(rejection.kind, RejectKind::InvalidJoin);
    assert_eq!(rejection.detail, "actor.first_name = customer.first_name");
}

#[test]
fn test_schema_unavailable() {
    let rejection = match query_validate("SELECT title FROM film", None) {
        Verdict::Rejected(rejection) => rejection,
        Verdict::Approved(_) => panic!("expected rejection"),
    };
    assert_eq!(rejection.kind, RejectKind::SchemaUnavailable);
}

#[test]
fn test_film_actor_scenario() {
    let schema = SchemaModel::new(
        ["film", "actor"],
        [
            ("film", vec!["title", "release_year"]),
            ("actor", vec!["first_name", "last_name"]),
        ],
        [],
    );
    let validator: Validator = Validator::default();

    assert_eq!(
        validator.validate("SELECT title FROM film", Some(&schema)),
        Verdict::Approved("SELECT title FROM film")
    );
    assert_eq!(
        validator.validate("SELECT titlex FROM film", Some(&schema)),
        Verdict::Rejected(Rejection::new(RejectKind::InvalidColumn, "film.titlex"))
    );
    assert_eq!(
        validator.validate("SELECT * FROM director", Some(&schema)),
        Verdict::Rejected(Rejection::new(RejectKind::InvalidTable, "director"))
    );
}

#[test]
fn test_rejection_messages() {
    let schema = pagila();
    assert_eq!(
        rejection("SELECT * FROM director", &schema).to_string(),
        "Invalid table: director"
    );
}

#[test]
fn test_derived_table_and_all_quantifier_approved() {
    let schema = pagila();
    for sql in [
        "SELECT total FROM (SELECT COUNT(*) AS total FROM film) t",
        "SELECT ALL title FROM film",
        "SELECT ALL title, release_year FROM film ORDER BY title",
    ] {
        assert_eq!(query_validate(sql, Some(&schema)), Verdict::Approved(sql), "{sql}");
    }
}

#[test]
fn test_comma_separated_from() {
    let schema = pagila();

    let unknown = rejection("SELECT title FROM film f, director d", &schema);
    assert_eq!(unknown.kind, RejectKind::InvalidTable);
    assert_eq!(unknown.detail, "director");

    let sql = "SELECT f.title, fa.actor_id FROM film f, film_actor fa WHERE f.film_id = fa.film_id";
    assert_eq!(query_validate(sql, Some(&schema)), Verdict::Approved(sql));

    let wrong_column = rejection(
        "SELECT f.title, fa.first_name FROM film f, film_actor fa WHERE f.film_id = fa.film_id",
        &schema,
    );
    assert_eq!(wrong_column.kind, RejectKind::InvalidColumn);
    assert_eq!(wrong_column.detail, "fa.first_name");
}
