#![allow(dead_code)]

use std::io::Error;

use pgtemp::{PgTempDB, PgTempDBBuilder};
use sqlgate_lib::pg::connect;
use sqlgate_lib::settings::{CatalogSettings, PgSettings};
use tokio_postgres::Client;

/// A subset of the pagila sample schema, plus a table introspection must skip.
pub const PAGILA_DDL: &str = r"
    CREATE TABLE actor (
        actor_id serial PRIMARY KEY,
        first_name text NOT NULL,
        last_name text NOT NULL
    );
    CREATE TABLE film (
        film_id serial PRIMARY KEY,
        title text NOT NULL,
        release_year integer
    );
    CREATE TABLE film_actor (
        actor_id integer NOT NULL REFERENCES actor (actor_id),
        film_id integer NOT NULL REFERENCES film (film_id),
        PRIMARY KEY (actor_id, film_id)
    );
    CREATE TABLE packages_apk (id integer PRIMARY KEY, name text);
    INSERT INTO actor (first_name, last_name) VALUES ('PENELOPE', 'GUINESS');
    INSERT INTO film (title, release_year) VALUES ('ACADEMY DINOSAUR', 2006);
    INSERT INTO film_actor (actor_id, film_id) VALUES (1, 1);
";

pub struct TestDb {
    pub db: PgTempDB,
    pub settings: PgSettings,
    pub client: Client,
}

pub fn catalog_settings() -> CatalogSettings {
    CatalogSettings {
        schema: "public".to_owned(),
        exclude_prefix: Some("packages_".to_owned()),
    }
}

pub async fn start_database() -> Result<TestDb, Error> {
    let db = PgTempDBBuilder::new()
        .with_dbname("sqlgate_test")
        .start_async()
        .await;

    let settings = PgSettings {
        host: "localhost".to_owned(),
        port: db.db_port(),
        user: db.db_user().to_owned(),
        password: Some(db.db_pass().to_owned()),
        database: db.db_name().to_owned(),
    };

    let client = connect(&settings, "test")
        .await
        .map_err(|e| Error::other(e.to_string()))?;

    Ok(TestDb {
        db,
        settings,
        client,
    })
}

pub async fn pagila_load(client: &Client) -> Result<(), Error> {
    client
        .batch_execute(PAGILA_DDL)
        .await
        .map_err(Error::other)
}
