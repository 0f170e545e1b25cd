//! PostgreSQL connection utilities.

use rootcause::Report;
use tokio_postgres::{Client, Config, NoTls};
use tracing::error;

use crate::settings::PgSettings;

use super::{PgError, PgResult};

/// Build a tokio_postgres Config from PgSettings.
pub fn config_build(settings: &PgSettings) -> Config {
    let mut config = Config::new();
    config
        .host(&settings.host)
        .port(settings.port)
        .user(&settings.user)
        .dbname(&settings.database);
    if let Some(ref password) = settings.password {
        config.password(password);
    }
    config
}

/// Connect to a PostgreSQL database using the provided settings.
///
/// Spawns a background task to drive the connection, so this must be called
/// from within a tokio runtime. The `context` parameter identifies the
/// connection in error messages.
pub async fn connect(settings: &PgSettings, context: &str) -> PgResult<Client> {
    let (client, connection) = config_build(settings)
        .connect(NoTls)
        .await
        .map_err(|error| {
            Report::new(PgError::Connect {
                context: context.to_owned(),
                error,
            })
        })?;

    let context = context.to_owned();
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("{context} connection error: {e}");
        }
    });

    Ok(client)
}
