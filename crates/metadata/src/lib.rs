//! Metadata extraction and filename derivation for tagged comic archives.
//!
//! Pure logic: nothing in this crate spawns processes or touches the
//! filesystem beyond inspecting path strings.

pub mod comic_file;
pub mod error;
pub mod filename;
pub mod parser;
pub mod record;

pub use comic_file::{ComicFile, TagState, UNTAGGED_MARKER};
pub use error::ParseError;
pub use filename::{FilenameParts, TargetFilename, build_target, sanitize_component};
pub use parser::{MetadataEnvelope, extract_record, parse_metadata};
pub use record::{Clock, FixedClock, MetadataRecord, SystemClock};
