use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use comicwatch_exec::TaggerError;
use comicwatch_metadata::ParseError;

/// Why an archive could not be brought to its final name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    TagInvocation,
    NoJsonFound,
    InvalidJson,
    UnrecognizedStructure,
    MissingSeries,
    MissingIssue,
    RenameFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TagInvocation => "tag_invocation",
            Self::NoJsonFound => "no_json_found",
            Self::InvalidJson => "invalid_json",
            Self::UnrecognizedStructure => "unrecognized_structure",
            Self::MissingSeries => "missing_series",
            Self::MissingIssue => "missing_issue",
            Self::RenameFailed => "rename_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The archive now carries this name.
    Renamed(String),
    /// Tagging worked but this name is already taken; the archive is left
    /// where it was.
    SkippedExists(String),
    /// Tagging or parsing failed and the archive was given the untagged
    /// marker.
    MarkedUntagged(FailureReason),
    /// A rename on disk failed.  The archive is in whatever state the
    /// failing step left it.
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Renamed(_) | Self::SkippedExists(_))
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::MarkedUntagged(reason) | Self::Failed(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed(name) => write!(f, "renamed to {name}"),
            Self::SkippedExists(name) => write!(f, "skipped, {name} already exists"),
            Self::MarkedUntagged(reason) => write!(f, "marked untagged ({reason})"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Tagger(#[from] TaggerError),

    #[error(transparent)]
    Metadata(#[from] ParseError),

    #[error("cannot rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} already exists", .0.display())]
    Occupied(PathBuf),
}

impl ProcessError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Tagger(_) => FailureReason::TagInvocation,
            Self::Metadata(ParseError::NoJsonFound) => FailureReason::NoJsonFound,
            Self::Metadata(ParseError::InvalidJson(_)) => FailureReason::InvalidJson,
            Self::Metadata(ParseError::UnrecognizedStructure) => {
                FailureReason::UnrecognizedStructure
            }
            Self::Metadata(ParseError::MissingSeries) => FailureReason::MissingSeries,
            Self::Metadata(ParseError::MissingIssue) => FailureReason::MissingIssue,
            Self::Rename { .. } | Self::Occupied(_) => FailureReason::RenameFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_map_to_reasons() {
        let cases = [
            (ParseError::NoJsonFound, FailureReason::NoJsonFound),
            (
                ParseError::InvalidJson("eof".to_string()),
                FailureReason::InvalidJson,
            ),
            (
                ParseError::UnrecognizedStructure,
                FailureReason::UnrecognizedStructure,
            ),
            (ParseError::MissingSeries, FailureReason::MissingSeries),
            (ParseError::MissingIssue, FailureReason::MissingIssue),
        ];
        for (err, expected) in cases {
            assert_eq!(ProcessError::from(err).reason(), expected);
        }
    }

    #[test]
    fn tagger_errors_are_tag_invocation() {
        let err = ProcessError::from(TaggerError::Failed {
            program: "comictagger".to_string(),
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        });
        assert_eq!(err.reason(), FailureReason::TagInvocation);
    }

    #[test]
    fn occupied_is_rename_failure() {
        let err = ProcessError::Occupied(PathBuf::from("/in/a [untagged].cbz"));
        assert_eq!(err.reason(), FailureReason::RenameFailed);
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn outcome_helpers() {
        assert!(Outcome::Renamed("a.cbz".to_string()).is_success());
        assert!(Outcome::SkippedExists("a.cbz".to_string()).is_success());
        let marked = Outcome::MarkedUntagged(FailureReason::MissingIssue);
        assert!(!marked.is_success());
        assert_eq!(marked.reason(), Some(FailureReason::MissingIssue));
        assert_eq!(marked.to_string(), "marked untagged (missing_issue)");
    }
}
