use std::{
    env,
    error::Error,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use error_set::error_set;
use lexopt::prelude::*;
use serde::Deserialize;

error_set! {
    ConfigError = {
        ArgumentError(Box<dyn Error + Send + Sync + 'static>),

        #[display("Missing argument: {name}")]
        ArgumentMissing { name: &'static str },
        IoError(io::Error),
    };
}

impl From<lexopt::Error> for ConfigError {
    fn from(error: lexopt::Error) -> Self {
        Self::ArgumentError(Box::new(error))
    }
}

/// Environment variable consulted when `--generator_api_key` is not given.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const USAGE: &str = "--origin_host HOST --origin_port PORT --origin_user USER --origin_database DB \
[--origin_password PASSWORD] [--schema SCHEMA] [--exclude_prefix PREFIX] [--listen ADDR] \
[--generator_url URL] [--generator_model MODEL] [--generator_api_key KEY] \
[--schema_refresh_secs SECS] [--metrics ADDR]";

#[derive(Debug, Clone, Deserialize)]
pub struct PgSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

/// Which part of the catalog is introspected.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Schema whose tables are exposed to the generator
    pub schema: String,
    /// Tables whose name starts with this prefix are left out
    pub exclude_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenSettings {
    pub socket: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub origin: PgSettings,
    pub catalog: CatalogSettings,
    pub listen: ListenSettings,
    pub generator: GeneratorSettings,
    /// Seconds between schema refreshes, 0 disables refresh
    pub schema_refresh_secs: u64,
    /// Address for the Prometheus metrics endpoint
    pub metrics: Option<SocketAddr>,
}

impl Settings {
    pub fn from_args() -> Result<Settings, ConfigError> {
        Self::from_parser(lexopt::Parser::from_env())
    }

    pub fn from_parser(mut parser: lexopt::Parser) -> Result<Settings, ConfigError> {
        let mut origin_host: Option<String> = None;
        let mut origin_port: Option<u16> = None;
        let mut origin_user: Option<String> = None;
        let mut origin_password: Option<String> = None;
        let mut origin_database: Option<String> = None;
        let mut schema: Option<String> = None;
        let mut exclude_prefix: Option<String> = None;
        let mut listen: Option<SocketAddr> = None;
        let mut generator_url: Option<String> = None;
        let mut generator_model: Option<String> = None;
        let mut generator_api_key: Option<String> = None;
        let mut schema_refresh_secs: Option<u64> = None;
        let mut metrics: Option<SocketAddr> = None;

        while let Some(arg) = parser.next()? {
            match arg {
                Long("origin_host") => origin_host = Some(parser.value()?.string()?),
                Long("origin_port") => origin_port = Some(parser.value()?.parse()?),
                Long("origin_user") => origin_user = Some(parser.value()?.string()?),
                Long("origin_password") => origin_password = Some(parser.value()?.string()?),
                Long("origin_database") => origin_database = Some(parser.value()?.string()?),
                Long("schema") => schema = Some(parser.value()?.string()?),
                Long("exclude_prefix") => exclude_prefix = Some(parser.value()?.string()?),
                Long("listen") => listen = Some(parser.value()?.parse()?),
                Long("generator_url") => generator_url = Some(parser.value()?.string()?),
                Long("generator_model") => generator_model = Some(parser.value()?.string()?),
                Long("generator_api_key") => generator_api_key = Some(parser.value()?.string()?),
                Long("schema_refresh_secs") => schema_refresh_secs = Some(parser.value()?.parse()?),
                Long("metrics") => metrics = Some(parser.value()?.parse()?),
                Long("help") => {
                    println!("Usage: {} {USAGE}", parser.bin_name().unwrap_or_default());
                    std::process::exit(1);
                }
                _ => return Err(ConfigError::ArgumentError(Box::new(arg.unexpected()))),
            }
        }

        let settings = Settings {
            origin: PgSettings {
                host: origin_host.ok_or(ConfigError::ArgumentMissing {
                    name: "origin_host",
                })?,
                port: origin_port.ok_or(ConfigError::ArgumentMissing {
                    name: "origin_port",
                })?,
                user: origin_user.ok_or(ConfigError::ArgumentMissing {
                    name: "origin_user",
                })?,
                password: origin_password,
                database: origin_database.ok_or(ConfigError::ArgumentMissing {
                    name: "origin_database",
                })?,
            },
            catalog: CatalogSettings {
                schema: schema.unwrap_or_else(|| "public".to_owned()),
                exclude_prefix: match exclude_prefix {
                    Some(prefix) if prefix.is_empty() => None,
                    Some(prefix) => Some(prefix),
                    None => Some("packages_".to_owned()),
                },
            },
            listen: ListenSettings {
                socket: listen.unwrap_or(SocketAddr::V4(SocketAddrV4::new(
                    Ipv4Addr::new(127, 0, 0, 1),
                    5000,
                ))),
            },
            generator: GeneratorSettings {
                base_url: generator_url
                    .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_owned()),
                model: generator_model.unwrap_or_else(|| "gemini-2.0-flash".to_owned()),
                api_key: generator_api_key.or_else(|| env::var(API_KEY_ENV).ok()),
            },
            schema_refresh_secs: schema_refresh_secs.unwrap_or(300),
            metrics,
        };

        Ok(settings)
    }
}
