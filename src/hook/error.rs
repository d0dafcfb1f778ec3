use thiserror::Error;

use crate::config::ConfigError;

/// Why a parameter merge was abandoned.
///
/// The merge hook never returns these to its caller; they are logged and the
/// run continues with its previous (or empty) parameters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MergeError {
    #[error("configuration source unreadable: {0}")]
    SourceUnreadable(#[source] ConfigError),

    #[error("malformed configuration entry: {0}")]
    MalformedEntry(#[source] ConfigError),

    #[error("run parameter '{0}' must be a table")]
    InvalidRunParam(String),
}

impl From<ConfigError> for MergeError {
    fn from(err: ConfigError) -> Self {
        if err.is_unreadable() {
            Self::SourceUnreadable(err)
        } else {
            Self::MalformedEntry(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classifies_config_errors() {
        let missing = MergeError::from(ConfigError::SourceNotFound(PathBuf::from("conf")));
        assert!(matches!(missing, MergeError::SourceUnreadable(_)));

        let cycle = MergeError::from(ConfigError::CircularReference);
        assert!(matches!(cycle, MergeError::MalformedEntry(_)));
    }

    #[test]
    fn test_message_includes_cause() {
        let err = MergeError::from(ConfigError::SourceNotFound(PathBuf::from("conf")));
        assert_eq!(
            err.to_string(),
            "configuration source unreadable: configuration source is not a directory: conf"
        );
    }
}
