//! Directory traversal that feeds text files into an index.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::{Result, SearchError};
use crate::index::{ConcurrentIndex, InvertedIndex, Position};
use crate::pool::TaskPool;
use crate::tokenizer;

/// Extension (compared case-insensitively) of files picked up by a build.
pub const TEXT_EXTENSION: &str = ".txt";

/// Populates an index from a directory tree.
pub trait IndexBuilder {
    type Index;

    /// Index every text file under `root`. Returns the number of files
    /// indexed or scheduled. Unreadable files are skipped with a warning.
    fn build(&mut self, index: &mut Self::Index, root: &Path) -> Result<usize>;
}

pub fn is_text_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(TEXT_EXTENSION))
        .unwrap_or(false)
}

/// Depth-first list of the text files under `root`.
///
/// Symbolic links are followed. Entries that cannot be read, including link
/// loops, are logged and skipped; only a missing or unreadable `root` is an
/// error.
pub fn text_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_text_file(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(err) if err.depth() == 0 => {
                return Err(SearchError::Traverse { path: root.to_path_buf(), source: err });
            }
            Err(err) => {
                tracing::warn!(error = %err, "unable to traverse entry, skipping");
            }
        }
    }
    Ok(files)
}

/// Identifier a file is indexed under: the walked path with `.` components
/// removed and `name/..` pairs collapsed.
pub fn location_of(path: &Path) -> String {
    normalize(path).to_string_lossy().into_owned()
}

/// Lexical path normalization; the filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(Component::ParentDir),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Add every word of `path` to `index`, numbering positions from 1 across the
/// whole file. The file is read completely before anything is added, so a
/// read failure leaves `index` untouched.
pub fn index_file(path: &Path, index: &mut InvertedIndex) -> Result<Position> {
    let text = fs::read_to_string(path).map_err(|source| SearchError::Read { path: path.to_path_buf(), source })?;
    let location = location_of(path);

    let mut position: Position = 0;
    for line in text.lines() {
        let cleaned = tokenizer::clean(line);
        for word in tokenizer::split_words(&cleaned) {
            position += 1;
            index.add(word, &location, position);
        }
    }
    Ok(position)
}

/// Single-threaded builder writing straight into an [`InvertedIndex`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileIndexer;

impl FileIndexer {
    pub fn new() -> Self {
        Self
    }
}

impl IndexBuilder for FileIndexer {
    type Index = InvertedIndex;

    fn build(&mut self, index: &mut InvertedIndex, root: &Path) -> Result<usize> {
        let mut indexed = 0;
        for file in text_files(root)? {
            match index_file(&file, index) {
                Ok(words) => {
                    tracing::debug!(file = %file.display(), words, "indexed file");
                    indexed += 1;
                }
                Err(err) => tracing::warn!(error = %err, "skipping unreadable file"),
            }
        }
        tracing::info!(root = %root.display(), files = indexed, words = index.num_words(), "build complete");
        Ok(indexed)
    }
}

/// Builder that indexes each file in its own pool job and merges the
/// per-file index into the shared one.
#[derive(Debug, Clone)]
pub struct PooledFileIndexer {
    pool: Arc<TaskPool>,
}

impl PooledFileIndexer {
    pub fn new(pool: Arc<TaskPool>) -> Self {
        Self { pool }
    }
}

impl IndexBuilder for PooledFileIndexer {
    type Index = Arc<ConcurrentIndex>;

    fn build(&mut self, index: &mut Arc<ConcurrentIndex>, root: &Path) -> Result<usize> {
        let files = text_files(root)?;
        let scheduled = files.len();

        for file in files {
            let shared = Arc::clone(index);
            tracing::debug!(file = %file.display(), "minion created");
            self.pool.submit(move || {
                let mut local = InvertedIndex::new();
                match index_file(&file, &mut local) {
                    Ok(_) => shared.merge(local),
                    Err(err) => tracing::warn!(error = %err, "skipping unreadable file"),
                }
                tracing::debug!(file = %file.display(), "minion finished");
            })?;
        }

        self.pool.await_idle();
        tracing::info!(root = %root.display(), files = scheduled, words = index.num_words(), "build complete");
        Ok(scheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_extension_is_case_insensitive() {
        assert!(is_text_file(Path::new("dir/NOTES.TXT")));
        assert!(is_text_file(Path::new("a.txt")));
        assert!(!is_text_file(Path::new("a.txt.bak")));
        assert!(!is_text_file(Path::new("readme.md")));
    }

    #[test]
    fn locations_drop_dot_components() {
        assert_eq!(location_of(Path::new("./corpus/a.txt")), "corpus/a.txt");
        assert_eq!(location_of(Path::new("corpus/./sub/../a.txt")), "corpus/a.txt");
        assert_eq!(location_of(Path::new("../corpus/a.txt")), "../corpus/a.txt");
        assert_eq!(location_of(Path::new("/../corpus/a.txt")), "/corpus/a.txt");
        assert_eq!(location_of(Path::new("a/../../b.txt")), "../b.txt");
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = FileIndexer::new().build(&mut InvertedIndex::new(), Path::new("/definitely/not/here"));
        assert!(result.is_err());
    }
}
