//! On-disk archive identity and its filename-encoded tag state.
//!
//! The untagged marker is the only state the daemon persists.  A file is in
//! exactly one of two states:
//!
//! | State      | Name on disk                      | Meaning                         |
//! |------------|-----------------------------------|---------------------------------|
//! | `Unmarked` | `<base><ext>`                     | new, being processed, or done   |
//! | `Untagged` | `<base> [untagged]<ext>`          | last attempt failed, retry due  |
//!
//! Only the file processor and the retry coordinator move a file between the
//! two paths.  Because the state lives in the name it survives restarts.

use std::path::{Path, PathBuf};

pub const UNTAGGED_MARKER: &str = " [untagged]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagState {
    Unmarked,
    Untagged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicFile {
    path: PathBuf,
    dir: PathBuf,
    base: String,
    extension: String,
    state: TagState,
}

impl ComicFile {
    /// Returns `None` when the path has no UTF-8 file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let stem = path.file_stem()?.to_str()?.to_string();
        let extension = match path.extension() {
            Some(ext) => format!(".{}", ext.to_str()?),
            None => String::new(),
        };
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        // Collapse repeated markers left behind by older tools.
        let mut base = stem.as_str();
        let mut state = TagState::Unmarked;
        while let Some(stripped) = base.strip_suffix(UNTAGGED_MARKER) {
            base = stripped;
            state = TagState::Untagged;
        }
        let base = base.to_string();

        Some(Self {
            path,
            dir,
            base,
            extension,
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// File stem with the marker removed.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Extension including its leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn state(&self) -> TagState {
        self.state
    }

    pub fn is_untagged(&self) -> bool {
        self.state == TagState::Untagged
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<base><ext>`
    pub fn bare_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.base, self.extension))
    }

    /// `<dir>/<base> [untagged]<ext>`, always with exactly one marker.
    pub fn marked_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", self.base, UNTAGGED_MARKER, self.extension))
    }

    /// The same archive at its bare path.
    pub fn unmarked(&self) -> Self {
        Self {
            path: self.bare_path(),
            dir: self.dir.clone(),
            base: self.base.clone(),
            extension: self.extension.clone(),
            state: TagState::Unmarked,
        }
    }

    /// Case-insensitive comparison against a dotted extension such as `.cbz`.
    pub fn matches_extension(&self, extension: &str) -> bool {
        !self.extension.is_empty() && self.extension.eq_ignore_ascii_case(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_file_is_unmarked() {
        let file = ComicFile::from_path("/in/Saga 001.cbz").unwrap();
        assert_eq!(file.state(), TagState::Unmarked);
        assert_eq!(file.base(), "Saga 001");
        assert_eq!(file.extension(), ".cbz");
        assert_eq!(file.file_name(), "Saga 001.cbz");
        assert_eq!(file.bare_path(), PathBuf::from("/in/Saga 001.cbz"));
        assert_eq!(
            file.marked_path(),
            PathBuf::from("/in/Saga 001 [untagged].cbz")
        );
    }

    #[test]
    fn marked_file_is_untagged() {
        let file = ComicFile::from_path("/in/Saga 001 [untagged].cbz").unwrap();
        assert!(file.is_untagged());
        assert_eq!(file.base(), "Saga 001");
        assert_eq!(file.bare_path(), PathBuf::from("/in/Saga 001.cbz"));
        assert_eq!(file.marked_path(), file.path());

        let bare = file.unmarked();
        assert_eq!(bare.state(), TagState::Unmarked);
        assert_eq!(bare.path(), Path::new("/in/Saga 001.cbz"));
        assert_eq!(bare.marked_path(), file.path());
    }

    #[test]
    fn duplicated_marker_collapses_to_one() {
        let file = ComicFile::from_path("/in/x [untagged] [untagged].cbz").unwrap();
        assert!(file.is_untagged());
        assert_eq!(file.base(), "x");
        assert_eq!(file.marked_path(), PathBuf::from("/in/x [untagged].cbz"));
    }

    #[test]
    fn marker_must_be_a_suffix() {
        let file = ComicFile::from_path("/in/[untagged] notes.cbz").unwrap();
        assert_eq!(file.state(), TagState::Unmarked);
    }

    #[test]
    fn extension_match_ignores_case() {
        let file = ComicFile::from_path("/in/Saga.CBZ").unwrap();
        assert!(file.matches_extension(".cbz"));
        assert!(!file.matches_extension(".cbr"));
        let bare = ComicFile::from_path("/in/README").unwrap();
        assert!(!bare.matches_extension(".cbz"));
        assert_eq!(bare.marked_path(), PathBuf::from("/in/README [untagged]"));
    }

    #[test]
    fn relative_path_without_parent() {
        let file = ComicFile::from_path("Saga.cbz").unwrap();
        assert_eq!(file.bare_path(), PathBuf::from("Saga.cbz"));
        assert_eq!(file.marked_path(), PathBuf::from("Saga [untagged].cbz"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(ComicFile::from_path("/").is_none());
    }
}
