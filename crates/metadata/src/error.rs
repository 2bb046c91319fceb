use thiserror::Error;

/// Why a tagger dump could not be turned into a [`crate::MetadataRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in tagger output")]
    NoJsonFound,

    #[error("tagger output contains invalid JSON: {0}")]
    InvalidJson(String),

    #[error("JSON does not match any known metadata layout")]
    UnrecognizedStructure,

    #[error("metadata has no usable series")]
    MissingSeries,

    #[error("metadata has no usable issue number")]
    MissingIssue,
}
