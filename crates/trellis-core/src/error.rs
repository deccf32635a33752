//! Error taxonomy for trellis operations.
//!
//! Every failure surfaced by the core is one of a small set of kinds so
//! callers can decide what to do without matching on engine-specific
//! messages. Raw `rusqlite` errors are classified on conversion:
//!
//! | SQLite condition              | Kind        |
//! |-------------------------------|-------------|
//! | `SQLITE_BUSY` / `SQLITE_LOCKED` | `Conflict` |
//! | UNIQUE / PRIMARY KEY / CHECK  | `Forbidden` |
//! | FOREIGN KEY                   | `NotFound`  |
//! | anything else                 | `Storage`   |

use std::fmt;

use rusqlite::ffi;

use crate::multitree::validate::LinkViolation;
use crate::multitree::LinkError;

/// Convenience alias used throughout the core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why an operation was refused because it would break an invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Forbidden {
    /// The proposed link fails structural validation.
    #[error("{0}")]
    Link(LinkViolation),
    /// Date nodes are named by their date and cannot be renamed.
    #[error("date node '{0}' cannot be renamed")]
    DateNodeRename(String),
    /// Another node already carries this alias.
    #[error("alias '{0}' is already in use")]
    AliasTaken(String),
    /// A storage constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),
}

/// Errors produced by the trellis core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("forbidden: {0}")]
    Forbidden(Forbidden),

    #[error("transaction conflict, retry")]
    Conflict(#[source] rusqlite::Error),

    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Build a `Storage` error from a plain message.
    pub fn storage(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Storage(message.into())
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NodeNotFound,
            Self::InvalidName(_) => ErrorCode::InvalidName,
            Self::InvalidSelector(_) => ErrorCode::InvalidSelector,
            Self::Forbidden(Forbidden::Link(LinkViolation::Cycle)) => ErrorCode::CycleDetected,
            Self::Forbidden(Forbidden::Link(LinkViolation::Diamond)) => ErrorCode::DiamondDetected,
            Self::Forbidden(Forbidden::Link(LinkViolation::DateNodeDest))
            | Self::Forbidden(Forbidden::DateNodeRename(_)) => ErrorCode::DateNodeProtected,
            Self::Forbidden(Forbidden::Link(_)) => ErrorCode::InvalidLink,
            Self::Forbidden(Forbidden::AliasTaken(_)) => ErrorCode::AliasTaken,
            Self::Forbidden(Forbidden::Constraint(_)) => ErrorCode::ConstraintViolation,
            Self::Conflict(_) => ErrorCode::TransactionConflict,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Config(_) => ErrorCode::ConfigParseError,
        }
    }

    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let rusqlite::Error::SqliteFailure(failure, detail) = &err else {
            return Self::Storage(Box::new(err));
        };

        match failure.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                Self::Conflict(err)
            }
            rusqlite::ErrorCode::ConstraintViolation => {
                let detail = detail
                    .clone()
                    .unwrap_or_else(|| "constraint failed".to_string());
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        Self::NotFound(format!("referenced node does not exist ({detail})"))
                    }
                    ffi::SQLITE_CONSTRAINT_UNIQUE
                    | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    | ffi::SQLITE_CONSTRAINT_CHECK => {
                        Self::Forbidden(Forbidden::Constraint(detail))
                    }
                    _ => Self::Storage(Box::new(err)),
                }
            }
            _ => Self::Storage(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<LinkViolation> for Error {
    fn from(violation: LinkViolation) -> Self {
        Self::Forbidden(Forbidden::Link(violation))
    }
}

impl From<LinkError> for Error {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::AlreadyExists { .. } => LinkViolation::AlreadyExists.into(),
            LinkError::SelfLink(_) => LinkViolation::SelfLink.into(),
            LinkError::Violation(violation) => violation.into(),
            LinkError::NotFound { .. } | LinkError::UnknownNode(_) => {
                Self::NotFound(err.to_string())
            }
        }
    }
}

/// Machine-readable error codes for scripts and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    NodeNotFound,
    InvalidName,
    InvalidSelector,
    InvalidLink,
    CycleDetected,
    DiamondDetected,
    DateNodeProtected,
    AliasTaken,
    ConstraintViolation,
    TransactionConflict,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::NodeNotFound => "E2001",
            Self::InvalidName => "E2002",
            Self::InvalidSelector => "E2003",
            Self::InvalidLink => "E3001",
            Self::CycleDetected => "E3002",
            Self::DiamondDetected => "E3003",
            Self::DateNodeProtected => "E3004",
            Self::AliasTaken => "E3005",
            Self::ConstraintViolation => "E3006",
            Self::TransactionConflict => "E5001",
            Self::StorageFailure => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::NodeNotFound => "Node not found",
            Self::InvalidName => "Invalid node name",
            Self::InvalidSelector => "Invalid node selector",
            Self::InvalidLink => "Invalid link",
            Self::CycleDetected => "Link would create a cycle",
            Self::DiamondDetected => "Link would create a second path",
            Self::DateNodeProtected => "Date nodes are managed automatically",
            Self::AliasTaken => "Alias already in use",
            Self::ConstraintViolation => "Storage constraint violated",
            Self::TransactionConflict => "Transaction conflict",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint shown next to the error.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix the syntax in trellis/config.toml and retry."),
            Self::NodeNotFound => Some("Use `trellis ls` or `trellis lsd` to find existing nodes."),
            Self::InvalidName => Some("Names must be 1-100 characters and must not look like a date."),
            Self::InvalidSelector => {
                Some("Select nodes by numeric id, YYYY-MM-DD date or alias ([A-Za-z0-9_-]).")
            }
            Self::InvalidLink | Self::ConstraintViolation => None,
            Self::CycleDetected => Some("The destination is already an ancestor of the origin."),
            Self::DiamondDetected => {
                Some("The destination is already reachable from the origin through another path.")
            }
            Self::DateNodeProtected => {
                Some("Date nodes are roots named by their date; attach tasks under them instead.")
            }
            Self::AliasTaken => Some("Pick another alias or `trellis unalias` the current owner."),
            Self::TransactionConflict => Some("Another trellis process is writing; retry the command."),
            Self::StorageFailure => Some("Check the database path, disk space and permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCode, Forbidden};
    use crate::multitree::validate::LinkViolation;
    use rusqlite::{Connection, params};
    use std::collections::HashSet;

    const ALL: [ErrorCode; 12] = [
        ErrorCode::ConfigParseError,
        ErrorCode::NodeNotFound,
        ErrorCode::InvalidName,
        ErrorCode::InvalidSelector,
        ErrorCode::InvalidLink,
        ErrorCode::CycleDetected,
        ErrorCode::DiamondDetected,
        ErrorCode::DateNodeProtected,
        ErrorCode::AliasTaken,
        ErrorCode::ConstraintViolation,
        ErrorCode::TransactionConflict,
        ErrorCode::StorageFailure,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    fn constraint_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE p (id INTEGER PRIMARY KEY, tag TEXT UNIQUE, n INTEGER CHECK (n > 0));
             CREATE TABLE c (id INTEGER PRIMARY KEY, p_id INTEGER NOT NULL REFERENCES p(id));
             INSERT INTO p (id, tag, n) VALUES (1, 'a', 1);",
        )
        .expect("schema");
        conn
    }

    #[test]
    fn unique_violation_is_forbidden() {
        let conn = constraint_db();
        let err: Error = conn
            .execute("INSERT INTO p (tag, n) VALUES (?1, 1)", params!["a"])
            .expect_err("duplicate tag")
            .into();
        assert!(matches!(err, Error::Forbidden(Forbidden::Constraint(_))), "{err:?}");
    }

    #[test]
    fn check_violation_is_forbidden() {
        let conn = constraint_db();
        let err: Error = conn
            .execute("INSERT INTO p (tag, n) VALUES ('b', 0)", [])
            .expect_err("check")
            .into();
        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
    }

    #[test]
    fn foreign_key_violation_is_not_found() {
        let conn = constraint_db();
        let err: Error = conn
            .execute("INSERT INTO c (p_id) VALUES (42)", [])
            .expect_err("dangling fk")
            .into();
        assert!(matches!(err, Error::NotFound(_)), "{err:?}");
    }

    #[test]
    fn other_errors_are_storage() {
        let conn = constraint_db();
        let err: Error = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .expect_err("no table")
            .into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn busy_writer_is_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("busy.db");
        let mut first = Connection::open(&path).expect("open first");
        first.execute_batch("CREATE TABLE t (x INTEGER)").expect("schema");
        let second = Connection::open(&path).expect("open second");
        second
            .busy_timeout(std::time::Duration::from_millis(0))
            .expect("timeout");

        let tx = first
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .expect("begin");
        let err: Error = second
            .execute("INSERT INTO t VALUES (1)", [])
            .expect_err("locked")
            .into();
        assert!(err.is_retryable(), "{err:?}");
        assert_eq!(err.code(), ErrorCode::TransactionConflict);
        drop(tx);
    }

    #[test]
    fn link_violations_map_to_specific_codes() {
        assert_eq!(Error::from(LinkViolation::Cycle).code(), ErrorCode::CycleDetected);
        assert_eq!(Error::from(LinkViolation::Diamond).code(), ErrorCode::DiamondDetected);
        assert_eq!(Error::from(LinkViolation::SelfLink).code(), ErrorCode::InvalidLink);
        assert_eq!(
            Error::from(LinkViolation::DateNodeDest).code(),
            ErrorCode::DateNodeProtected
        );
    }

    #[test]
    fn forbidden_messages_name_the_offender() {
        assert_eq!(
            Error::from(LinkViolation::Cycle).to_string(),
            "forbidden: link would create a cycle"
        );
        assert_eq!(
            Forbidden::DateNodeRename("2024-01-01".to_string()).to_string(),
            "date node '2024-01-01' cannot be renamed"
        );
        assert_eq!(
            Error::Forbidden(Forbidden::AliasTaken("work".to_string())).to_string(),
            "forbidden: alias 'work' is already in use"
        );
        assert_eq!(
            Forbidden::Constraint("links.origin_id".to_string()).to_string(),
            "constraint violated: links.origin_id"
        );
    }
}
