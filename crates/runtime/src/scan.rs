//! Non-recursive listing of the watched directory.

use std::io;
use std::path::Path;

use comicwatch_metadata::ComicFile;

/// Regular files in `dir` whose extension matches, sorted by path.  Names
/// that are not UTF-8 are skipped.
pub async fn scan_archives(dir: &Path, extension: &str) -> io::Result<Vec<ComicFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let is_file = match entry.file_type().await {
            Ok(kind) => kind.is_file(),
            Err(_) => false,
        };
        if !is_file {
            continue;
        }
        if let Some(file) = ComicFile::from_path(entry.path()) {
            if file.matches_extension(extension) {
                files.push(file);
            }
        }
    }
    files.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(files)
}

/// Archives currently carrying the untagged marker.
pub async fn scan_untagged(dir: &Path, extension: &str) -> io::Result<Vec<ComicFile>> {
    let mut files = scan_archives(dir, extension).await?;
    files.retain(ComicFile::is_untagged);
    Ok(files)
}
