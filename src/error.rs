use thiserror::Error;

/// Failure kinds callers need to tell apart from a plain store error.
///
/// Public operations return `anyhow::Result`; match on these with
/// `err.downcast_ref::<MigrationError>()`.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("database dump is version {dump}, newer than the supported version {current}")]
    DumpTooNew { dump: i64, current: i64 },

    #[error("Internal error, database version not updated to current instead was: {0}")]
    VersionMismatch(i64),

    #[error("the dump does not contain a challenge description")]
    MissingChallenge,

    #[error("no value for parameter {param} (tournament {tournament}) and no default")]
    MissingParameter { param: String, tournament: i64 },

    #[error("database is inconsistent: {0}")]
    Inconsistent(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("unknown tournament: {0}")]
    UnknownTournament(String),

    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    #[error("not a valid table or column name: {0:?}")]
    InvalidIdentifier(String),
}
