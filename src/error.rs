use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, decoding or resolving dataset content.
///
/// Failed validation checks are *not* errors: they are reported as
/// [`CheckResult`](crate::validation::CheckResult) values with `passed == false`.
#[derive(Error, Debug)]
pub enum Error {
    /// A file or directory the operation needs does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Tabular content could not be decoded.
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A token or cross-reference is outside its closed set.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The client or schema configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_path() {
        let err = Error::NotFound(PathBuf::from("/data/primary"));
        assert!(err.to_string().contains("/data/primary"));
    }

    #[test]
    fn parse_error_carries_message() {
        let err = Error::parse("a.csv", "missing column 'LabChartTime'");
        let text = err.to_string();
        assert!(text.contains("a.csv"));
        assert!(text.contains("LabChartTime"));
    }
}
