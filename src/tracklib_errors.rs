//! Error taxonomy shared by every tracklib subsystem.
//!
//! Element-wise numerical anomalies are **not** errors: operators write the no-data
//! sentinel at the offending index and continue. Everything else is surfaced as a
//! [`TrackError`].
use thiserror::Error;

/// Discriminant of a [`TrackError`], convenient to match without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingFeature,
    Structural,
    Index,
    WrongArgument,
    Parse,
    Numerical,
    Cancelled,
    Io,
}

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Feature not found on track: {0}")]
    MissingFeature(String),

    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Index {index} out of range (size {size})")]
    Index { index: usize, size: usize },

    #[error("Wrong argument: {0}")]
    WrongArgument(String),

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl TrackError {
    /// Kind of the error, independent of its payload.
    pub fn kind(&self) -> ErrorKind {
        use TrackError::*;
        match self {
            MissingFeature(_) => ErrorKind::MissingFeature,
            Structural(_) => ErrorKind::Structural,
            Index { .. } => ErrorKind::Index,
            WrongArgument(_) => ErrorKind::WrongArgument,
            Parse { .. } | Csv(_) | Xml(_) => ErrorKind::Parse,
            Numerical(_) => ErrorKind::Numerical,
            Cancelled => ErrorKind::Cancelled,
            Io(_) => ErrorKind::Io,
        }
    }

    /// Build a parse error positioned in a file.
    pub fn parse(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        TrackError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn missing(name: &str) -> Self {
        TrackError::MissingFeature(name.to_string())
    }

    pub(crate) fn wrong(msg: impl Into<String>) -> Self {
        TrackError::WrongArgument(msg.into())
    }
}

impl PartialEq for TrackError {
    fn eq(&self, other: &Self) -> bool {
        use TrackError::*;
        match (self, other) {
            (MissingFeature(a), MissingFeature(b)) => a == b,
            (Structural(a), Structural(b)) => a == b,
            (Index { index: a, size: sa }, Index { index: b, size: sb }) => a == b && sa == sb,
            (WrongArgument(a), WrongArgument(b)) => a == b,
            (
                Parse {
                    path: pa,
                    line: la,
                    message: ma,
                },
                Parse {
                    path: pb,
                    line: lb,
                    message: mb,
                },
            ) => pa == pb && la == lb && ma == mb,
            (Numerical(a), Numerical(b)) => a == b,
            (Cancelled, Cancelled) => true,

            // Wrapped foreign errors are not comparable: same variant means equal
            (Io(_), Io(_)) => true,
            (Csv(_), Csv(_)) => true,
            (Xml(_), Xml(_)) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tracklib_errors_test {
    use super::*;

    #[test]
    fn test_kind_and_display() {
        let err = TrackError::Index { index: 12, size: 3 };
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(err.to_string().contains("12"));

        let err = TrackError::parse("a.csv", 4, "bad float");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.to_string(), "Parse error in a.csv at line 4: bad float");
    }

    #[test]
    fn test_partial_eq() {
        assert_eq!(TrackError::missing("speed"), TrackError::missing("speed"));
        assert_ne!(TrackError::missing("speed"), TrackError::missing("ds"));
        assert_ne!(TrackError::Cancelled, TrackError::wrong("x"));
    }
}
