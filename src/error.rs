use thiserror::Error;

/// An error raised while resolving or applying a property path.
///
/// Both kinds are caller bugs (a badly built path string, or a path that
/// disagrees with the shape of the data it is applied to). Nothing in this
/// crate catches them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    /// The path text does not follow the path grammar.
    #[error("{path}:{offset}: {message} (path-parse-error)")]
    Parse {
        path: String,
        message: String,
        /// 0-based character offset of the offending token
        offset: usize,
    },
    /// The path is well formed but the data at some step is the wrong kind.
    #[error("{path}: {message} (path-type-mismatch)")]
    TypeMismatch { path: String, message: String },
}

impl PathError {
    pub fn parse_error(path: &str, message: String, offset: usize) -> Self {
        PathError::Parse {
            path: path.to_string(),
            message,
            offset,
        }
    }

    pub fn type_mismatch(path: &str, message: String) -> Self {
        PathError::TypeMismatch {
            path: path.to_string(),
            message,
        }
    }

    /// Stable machine-readable code, as reported over the FFI.
    pub fn code(&self) -> &'static str {
        match self {
            PathError::Parse { .. } => "path-parse-error",
            PathError::TypeMismatch { .. } => "path-type-mismatch",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PathError::Parse { message, .. } | PathError::TypeMismatch { message, .. } => message,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            PathError::Parse { path, .. } | PathError::TypeMismatch { path, .. } => path,
        }
    }
}

/// An error raised by the update-variable action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("invalid update-variable settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::Path(err) => err.code(),
            ActionError::Settings(_) => "invalid-settings",
        }
    }
}
