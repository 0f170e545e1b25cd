//! Result extensions for location-tracking error reports.
//!
//! Errors travel as `rootcause::Report<E>`. `?` captures the location where a
//! plain error first becomes a report; [`ReportExt::attach_loc`] adds a
//! breadcrumb at each further hop:
//!
//! ```text
//!  ● Query(db error: relation "film" does not exist)
//!  ├ src/pg/introspect.rs:61
//!  ╰ loading tables at src/pg/introspect.rs:29
//! ```

use rootcause::Report;
use rootcause::hooks::builtin_hooks::location::Location;

/// A message paired with the source location it was attached at.
#[derive(Debug, Clone)]
pub struct LocatedAttachment {
    pub message: String,
    pub location: Location,
}

impl core::fmt::Display for LocatedAttachment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

pub trait ReportExt<C> {
    type Output;

    /// Attach a message along with the caller's file:line location.
    fn attach_loc(self, message: impl Into<String>) -> Self::Output;
}

impl<C> ReportExt<C> for Report<C> {
    type Output = Report<C>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Report<C> {
        self.attach(LocatedAttachment {
            message: message.into(),
            location: Location::caller(),
        })
    }
}

impl<T, C> ReportExt<C> for Result<T, Report<C>> {
    type Output = Result<T, Report<C>>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Result<T, Report<C>> {
        let location = Location::caller();
        self.map_err(|e| {
            e.attach(LocatedAttachment {
                message: message.into(),
                location,
            })
        })
    }
}

/// Convert `Result<T, E>` into `Result<T, Report<C>>` through `E: Into<C>`,
/// e.g. `tokio_postgres::Error` -> `PgError` -> `Report<PgError>`.
pub trait MapIntoReport<T, E> {
    fn map_into_report<C>(self) -> Result<T, Report<C>>
    where
        E: Into<C>,
        C: std::error::Error + Send + Sync + 'static;
}

impl<T, E> MapIntoReport<T, E> for Result<T, E> {
    #[track_caller]
    fn map_into_report<C>(self) -> Result<T, Report<C>>
    where
        E: Into<C>,
        C: std::error::Error + Send + Sync + 'static,
    {
        self.map_err(|e| e.into().into())
    }
}
