use std::error::Error;

use sqlgate_lib::server::server_run;
use sqlgate_lib::settings::Settings;
use sqlgate_lib::tracing_utils::LineFormatter;

use tokio::runtime::Builder;
use tracing::{Level, error};

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_args()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(true)
        .event_format(LineFormatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .thread_name("sqlgate")
        .build()?;

    rt.block_on(server_run(&settings)).map_err(|report| {
        error!("{report}");
        Box::new(report.into_current_context()) as Box<dyn Error>
    })
}
