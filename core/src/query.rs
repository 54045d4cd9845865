//! Evaluation of query files against an index.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::index::{ConcurrentIndex, InvertedIndex};
use crate::lock::ReadWriteLock;
use crate::persist::QueryResults;
use crate::pool::TaskPool;
use crate::tokenizer;

/// Clean a query line and sort its words. Duplicates are kept: a word listed
/// twice counts twice.
pub fn normalize_query(line: &str) -> Vec<String> {
    let mut words = tokenizer::tokenize_line(line);
    words.sort_unstable();
    words
}

/// Read all lines of a query file before any of them is evaluated.
pub fn read_query_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| SearchError::QueryFile { path: path.to_path_buf(), source })?;
    Ok(text.lines().map(str::to_owned).collect())
}

/// Runs query lines against an index and collects ranked results.
pub trait QueryEngine {
    type Index;

    /// Evaluate each line, keyed by its normalized text.
    ///
    /// A line left without words after cleaning (blank, or punctuation only)
    /// gets no entry in the results: its empty prefix would match every word.
    fn search_lines(&mut self, index: &Self::Index, lines: Vec<String>, exact: bool) -> Result<QueryResults>;

    /// Evaluate every line of the query file at `path`.
    fn query(&mut self, index: &Self::Index, path: &Path, exact: bool) -> Result<QueryResults> {
        let lines = read_query_lines(path)?;
        tracing::debug!(path = %path.display(), lines = lines.len(), exact, "read query file");
        self.search_lines(index, lines, exact)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialQueryEngine;

impl SequentialQueryEngine {
    pub fn new() -> Self {
        Self
    }
}

impl QueryEngine for SequentialQueryEngine {
    type Index = InvertedIndex;

    fn search_lines(&mut self, index: &InvertedIndex, lines: Vec<String>, exact: bool) -> Result<QueryResults> {
        let mut results = QueryResults::new();
        for line in lines {
            let words = normalize_query(&line);
            if words.is_empty() {
                continue;
            }
            let ranked = if exact { index.exact_search(&words) } else { index.partial_search(&words) };
            results.insert(words.join(" "), ranked);
        }
        tracing::info!(queries = results.len(), exact, "queries evaluated");
        Ok(results)
    }
}

/// One pool job per query line; results collected under their own lock.
#[derive(Debug, Clone)]
pub struct PooledQueryEngine {
    pool: Arc<TaskPool>,
}

impl PooledQueryEngine {
    pub fn new(pool: Arc<TaskPool>) -> Self {
        Self { pool }
    }
}

impl QueryEngine for PooledQueryEngine {
    type Index = Arc<ConcurrentIndex>;

    fn search_lines(&mut self, index: &Arc<ConcurrentIndex>, lines: Vec<String>, exact: bool) -> Result<QueryResults> {
        let results = Arc::new(ReadWriteLock::new(QueryResults::new()));

        for line in lines {
            let index = Arc::clone(index);
            let results = Arc::clone(&results);
            self.pool.submit(move || {
                let words = normalize_query(&line);
                if words.is_empty() {
                    return;
                }
                let ranked = if exact { index.exact_search(&words) } else { index.partial_search(&words) };
                let key = words.join(" ");
                tracing::debug!(query = %key, hits = ranked.len(), "minion finished");
                results.write().insert(key, ranked);
            })?;
        }

        self.pool.await_idle();
        let results = results.read().clone();
        tracing::info!(queries = results.len(), exact, "queries evaluated");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sorts_and_keeps_duplicates() {
        assert_eq!(normalize_query("Dog cat, DOG!"), vec!["cat", "dog", "dog"]);
        assert!(normalize_query("  ?!  ").is_empty());
    }

    #[test]
    fn blank_lines_get_no_entry() {
        let mut index = InvertedIndex::new();
        index.add("cat", "a", 1);
        let lines = vec![String::new(), "  ?! ".to_owned(), "cat".to_owned()];
        for exact in [true, false] {
            let results = SequentialQueryEngine::new().search_lines(&index, lines.clone(), exact).unwrap();
            assert_eq!(results.keys().collect::<Vec<_>>(), vec!["cat"]);
        }

        let pool = Arc::new(TaskPool::new(2).unwrap());
        let shared = Arc::new(ConcurrentIndex::from(index));
        let results = PooledQueryEngine::new(pool.clone()).search_lines(&shared, lines, false).unwrap();
        pool.shutdown();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["cat"]);
    }

    #[test]
    fn word_order_does_not_change_the_key() {
        let mut index = InvertedIndex::new();
        index.add("cat", "a", 1);
        index.add("dog", "a", 2);
        let lines = vec!["dog cat".to_owned(), "Cat dog".to_owned()];
        let results = SequentialQueryEngine::new().search_lines(&index, lines, true).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results["cat dog"][0].count(), 2);
    }
}
