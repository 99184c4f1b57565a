use std::path::Path;

/// Coarse classification of a stage-aborting failure.
///
/// The kind decides the process exit code; the message carries the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An expected input file does not exist.
    MissingFile,
    /// The file exists but its schema or contents cannot be used.
    MalformedData,
    /// Invalid configuration (flags, env vars, TOML file).
    Config,
    /// An output artifact could not be written.
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::MissingFile | ErrorKind::Config => 2,
            ErrorKind::MalformedData => 3,
            ErrorKind::Io => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_file(path: &Path) -> Self {
        Self::new(
            ErrorKind::MissingFile,
            format!("Input file '{}' not found.", path.display()),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedData, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// Map a failed `File::open` to missing-file vs generic I/O.
    pub fn open_failed(path: &Path, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::missing_file(path)
        } else {
            Self::io(format!("Failed to open '{}': {err}", path.display()))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_missing_file() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let app = AppError::open_failed(Path::new("data/all_month.csv"), &err);
        assert_eq!(app.kind(), ErrorKind::MissingFile);
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("data/all_month.csv"));
    }

    #[test]
    fn other_open_errors_map_to_io() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let app = AppError::open_failed(Path::new("x.csv"), &err);
        assert_eq!(app.kind(), ErrorKind::Io);
        assert_eq!(app.exit_code(), 5);
    }
}
