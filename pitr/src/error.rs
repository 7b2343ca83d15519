use std::error;
use std::fmt;

/// Convenient result type for collector operations using [`PitrError`] as the error type.
pub type PitrResult<T> = Result<T, PitrError>;

/// Main error type for binlog collection.
///
/// A [`PitrError`] is either a single error, made of an [`ErrorKind`] and a static description
/// of the operation that failed, optionally enriched with a dynamic detail describing the cause,
/// or an aggregate of multiple errors.
#[derive(Debug, Clone)]
pub struct PitrError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Many(Vec<PitrError>),
}

/// Categories of errors that can occur while collecting binlogs.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source Errors
    SourceConnectionFailed,
    SourceQueryFailed,
    HostResolutionFailed,

    // Extraction Errors
    ExtractionFailed,
    ConduitError,

    // Storage Errors
    StorageConnectionFailed,
    StorageReadFailed,
    StorageWriteFailed,
    ObjectNotFound,

    // IO & Data Errors
    IoError,
    ConversionError,
    InvalidData,

    // Unknown / Uncategorized
    Unknown,

    // Special error kind used by tests that inject failures via fault points.
    #[cfg(feature = "failpoints")]
    WithNoRetry,
}

impl PitrError {
    /// Creates a [`PitrError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<PitrError>) -> PitrError {
        PitrError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the description of the operation that failed.
    ///
    /// For multiple errors, returns the description of the first one.
    pub fn description(&self) -> Option<&'static str> {
        match self.repr {
            ErrorRepr::WithDescription(_, desc)
            | ErrorRepr::WithDescriptionAndDetail(_, desc, _) => Some(desc),
            ErrorRepr::Many(ref errors) => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }

    /// Returns `true` when the error signals a missing object in the blob store.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::ObjectNotFound
    }
}

impl PartialEq for PitrError {
    fn eq(&self, other: &PitrError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PitrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")
                } else if errors.len() == 1 {
                    errors[0].fmt(f)
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl error::Error for PitrError {}

impl From<(ErrorKind, &'static str)> for PitrError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> PitrError {
        PitrError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for PitrError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> PitrError {
        PitrError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Converts [`std::io::Error`] to [`PitrError`] with [`ErrorKind::IoError`].
///
/// An I/O error wrapping a [`PitrError`] (as produced by readers that fail mid-stream) is
/// unwrapped, so the original kind survives the trip through [`tokio::io::AsyncRead`].
impl From<std::io::Error> for PitrError {
    fn from(err: std::io::Error) -> PitrError {
        if err.get_ref().is_some_and(|inner| inner.is::<PitrError>()) {
            if let Some(Ok(inner)) = err.into_inner().map(|inner| inner.downcast::<PitrError>()) {
                return *inner;
            }

            return PitrError::from((ErrorKind::IoError, "I/O error occurred"));
        }

        PitrError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

impl From<PitrError> for std::io::Error {
    fn from(err: PitrError) -> std::io::Error {
        std::io::Error::other(err)
    }
}

/// Converts [`std::string::FromUtf8Error`] to [`PitrError`] with [`ErrorKind::ConversionError`].
impl From<std::string::FromUtf8Error> for PitrError {
    fn from(err: std::string::FromUtf8Error) -> PitrError {
        PitrError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConversionError,
                "UTF-8 string conversion failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`sqlx::Error`] to [`PitrError`].
///
/// I/O and pool errors map to [`ErrorKind::SourceConnectionFailed`], everything else to
/// [`ErrorKind::SourceQueryFailed`].
impl From<sqlx::Error> for PitrError {
    fn from(err: sqlx::Error) -> PitrError {
        let kind = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut => ErrorKind::SourceConnectionFailed,
            _ => ErrorKind::SourceQueryFailed,
        };

        PitrError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                kind,
                "Database operation failed",
                err.to_string(),
            ),
        }
    }
}
