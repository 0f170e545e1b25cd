pub mod alias;
pub mod clean;
pub mod extract;
pub mod join;
pub mod validate;

pub use clean::sql_clean;
pub use validate::{RejectKind, Rejection, Validator, Verdict, query_validate};
