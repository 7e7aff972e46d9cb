//! Opaque session state handed to source backends.

use std::path::{Path, PathBuf};

/// Session file used when neither `--state` nor `--no-state` is given.
pub const DEFAULT_STATE_FILE: &str = "deduper";

/// Location of a persisted authentication/session artifact.
///
/// The dedup engine never reads or interprets the artifact. It is only
/// carried to the backend that opens the message source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    path: Option<PathBuf>,
}

impl SessionState {
    /// Session persistence disabled.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { path: None }
    }

    /// Session persisted at `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Resolves the CLI flags: `--no-state` wins over any `--state` value,
    /// and a missing `--state` falls back to [`DEFAULT_STATE_FILE`].
    #[must_use]
    pub fn from_flags(state: Option<PathBuf>, no_state: bool) -> Self {
        if no_state {
            return Self::disabled();
        }
        Self::at(state.unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)))
    }

    /// Returns the session path, if persistence is enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_file() {
        let state = SessionState::from_flags(None, false);
        assert_eq!(state.path(), Some(Path::new(DEFAULT_STATE_FILE)));
    }

    #[test]
    fn test_no_state_overrides_state() {
        let state = SessionState::from_flags(Some(PathBuf::from("mine")), true);
        assert_eq!(state, SessionState::disabled());
        assert!(state.path().is_none());
    }

    #[test]
    fn test_explicit_state() {
        let state = SessionState::from_flags(Some(PathBuf::from("mine")), false);
        assert_eq!(state.path(), Some(Path::new("mine")));
    }
}
