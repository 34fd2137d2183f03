//! Import error taxonomy

use thiserror::Error;

/// Errors raised while validating and importing course data.
///
/// Storage-level failures surface as `rusqlite::Error` through `anyhow`;
/// these cover the domain rules the database cannot check on its own.
#[derive(Debug, Error)]
pub enum ImportError {
    /// `year` and `semester` are mandatory on every course record.
    #[error("course {clbid}: missing required field `{field}`")]
    MissingField { clbid: i64, field: &'static str },

    #[error("invalid time string `{0}`: expected `<days> <start>-<end>`")]
    BadTimeString(String),

    #[error(
        "cannot derive (year, semester) from `{0}`: \
         expected a 4-digit year followed by a 1-digit semester code"
    )]
    BadFileName(String),

    /// A value reached the link writer without going through the resolver.
    #[error("`{value}` was not resolved against the `{table}` table")]
    Unresolved { table: &'static str, value: String },
}
