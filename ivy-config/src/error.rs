use std::fmt;
use std::path::PathBuf;

/// A `file:line` location within a `.ivy` file, attached to every parse and
/// validation error so the CLI can report it the way the original tool
/// reports config errors (spec.md §7 error kind 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcLoc {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for SrcLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}: unrecognized section header {1:?}")]
    UnknownSection(SrcLoc, String),

    #[error("{0}: expected '[section]' or 'key value', got {1:?}")]
    Malformed(SrcLoc, String),

    #[error("{0}: unrecognized option {1:?} in [options]")]
    UnknownOption(SrcLoc, String),

    #[error("{0}: option 'top' must not be empty")]
    EmptyTop(SrcLoc),

    #[error("missing required [options] key 'top'")]
    MissingTop,

    #[error("{0}: invalid boolean value {1:?}, expected true/false/1/0")]
    InvalidBool(SrcLoc, String),

    #[error("{0}: duplicate source filename {1:?}")]
    DuplicateFilename(SrcLoc, String),

    #[error("{0}: path {1:?} escapes the config directory via '..'")]
    PathEscape(SrcLoc, String),

    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),
}
