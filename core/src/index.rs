use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::sync::Arc;

use crate::error::Result;
use crate::lock::ReadWriteLock;
use crate::persist;

/// 1-based word position within a file or page.
pub type Position = u32;

/// Positions of a word within one location, ascending and unique.
pub type Positions = BTreeSet<Position>;

/// Location (file path or URL) to positions.
pub type Postings = BTreeMap<String, Positions>;

/// One location's aggregate match for a query.
///
/// Ordering is the ranking: higher count first, then earlier first position,
/// then path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "where")]
    path: String,
    count: usize,
    #[serde(rename = "index")]
    first_position: Position,
}

impl SearchResult {
    pub fn new(count: usize, first_position: Position, path: impl Into<String>) -> Self {
        Self { path: path.into(), count, first_position }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn first_position(&self) -> Position {
        self.first_position
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn add_count(&mut self, count: usize) {
        self.count += count;
    }

    /// Keep the earlier of the current and the given position.
    pub fn update_first_position(&mut self, position: Position) {
        self.first_position = self.first_position.min(position);
    }
}

impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .count
            .cmp(&self.count)
            .then_with(|| self.first_position.cmp(&other.first_position))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Word to location to positions, ordered at every level.
///
/// Every stored word has at least one location and every stored location at
/// least one position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    words: BTreeMap<String, Postings>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `word` at `position` in `location`. Returns `false` if the
    /// triple was already present.
    pub fn add(&mut self, word: &str, location: &str, position: Position) -> bool {
        // avoid allocating keys on the hot path when both levels already exist
        if let Some(postings) = self.words.get_mut(word) {
            if let Some(positions) = postings.get_mut(location) {
                return positions.insert(position);
            }
            return postings
                .entry(location.to_owned())
                .or_default()
                .insert(position);
        }
        self.words
            .entry(word.to_owned())
            .or_default()
            .entry(location.to_owned())
            .or_default()
            .insert(position)
    }

    /// Union every word, location and position of `other` into this index.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (word, other_postings) in other.words {
            match self.words.get_mut(&word) {
                None => {
                    self.words.insert(word, other_postings);
                }
                Some(postings) => {
                    for (location, positions) in other_postings {
                        match postings.get_mut(&location) {
                            None => {
                                postings.insert(location, positions);
                            }
                            Some(existing) => existing.extend(positions),
                        }
                    }
                }
            }
        }
    }

    pub fn exact_search<S: AsRef<str>>(&self, words: &[S]) -> Vec<SearchResult> {
        let mut hits = Hits::default();
        for word in words {
            if let Some(postings) = self.words.get(word.as_ref()) {
                hits.record(postings);
            }
        }
        hits.ranked()
    }

    pub fn partial_search<S: AsRef<str>>(&self, prefixes: &[S]) -> Vec<SearchResult> {
        let mut hits = Hits::default();
        for prefix in prefixes {
            let prefix = prefix.as_ref();
            for (_, postings) in self
                .words
                .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
                .take_while(|(word, _)| word.starts_with(prefix))
            {
                hits.record(postings);
            }
        }
        hits.ranked()
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.words
            .get(word)
            .is_some_and(|postings| postings.contains_key(location))
    }

    pub fn postings(&self, word: &str) -> Option<&Postings> {
        self.words.get(word)
    }

    pub fn positions(&self, word: &str, location: &str) -> Option<&Positions> {
        self.words.get(word)?.get(location)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.keys().map(String::as_str)
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.words.get(word).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Drop empty position sets and locations, e.g. after parsing external
    /// input.
    pub(crate) fn prune(&mut self) {
        for postings in self.words.values_mut() {
            postings.retain(|_, positions| !positions.is_empty());
        }
        self.words.retain(|_, postings| !postings.is_empty());
    }
}

/// Per-query accumulator keyed by location.
#[derive(Default)]
struct Hits {
    by_location: HashMap<String, SearchResult>,
}

impl Hits {
    fn record(&mut self, postings: &Postings) {
        for (location, positions) in postings {
            let Some(&first) = positions.first() else {
                continue;
            };
            match self.by_location.get_mut(location) {
                Some(result) => {
                    result.add_count(positions.len());
                    result.update_first_position(first);
                }
                None => {
                    self.by_location.insert(
                        location.clone(),
                        SearchResult::new(positions.len(), first, location.clone()),
                    );
                }
            }
        }
    }

    fn ranked(self) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self.by_location.into_values().collect();
        results.sort();
        results
    }
}

/// Read side shared by the sequential and the concurrent index.
pub trait IndexView {
    fn exact_search(&self, words: &[String]) -> Vec<SearchResult>;

    fn partial_search(&self, prefixes: &[String]) -> Vec<SearchResult>;

    fn search(&self, words: &[String], exact: bool) -> Vec<SearchResult> {
        if exact {
            self.exact_search(words)
        } else {
            self.partial_search(words)
        }
    }

    /// Render the index as nested JSON into `sink`.
    fn write_json(&self, sink: &mut dyn Write) -> Result<()>;

    fn num_words(&self) -> usize;
}

impl IndexView for InvertedIndex {
    fn exact_search(&self, words: &[String]) -> Vec<SearchResult> {
        InvertedIndex::exact_search(self, words)
    }

    fn partial_search(&self, prefixes: &[String]) -> Vec<SearchResult> {
        InvertedIndex::partial_search(self, prefixes)
    }

    fn write_json(&self, sink: &mut dyn Write) -> Result<()> {
        persist::write_index(sink, self)
    }

    fn num_words(&self) -> usize {
        InvertedIndex::num_words(self)
    }
}

/// [`InvertedIndex`] behind a [`ReadWriteLock`]. Writes take the write lock,
/// searches and serialization take the read lock, each exactly once.
#[derive(Debug, Default)]
pub struct ConcurrentIndex {
    inner: ReadWriteLock<InvertedIndex>,
}

impl ConcurrentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, word: &str, location: &str, position: Position) -> bool {
        tracing::trace!(word, location, position, "add");
        self.inner.write().add(word, location, position)
    }

    pub fn merge(&self, other: InvertedIndex) {
        if other.is_empty() {
            return;
        }
        self.inner.write().merge(other);
    }

    pub fn exact_search<S: AsRef<str>>(&self, words: &[S]) -> Vec<SearchResult> {
        self.inner.read().exact_search(words)
    }

    pub fn partial_search<S: AsRef<str>>(&self, prefixes: &[S]) -> Vec<SearchResult> {
        self.inner.read().partial_search(prefixes)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> InvertedIndex {
        self.inner.read().clone()
    }

    pub fn num_words(&self) -> usize {
        self.inner.read().num_words()
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl From<InvertedIndex> for ConcurrentIndex {
    fn from(index: InvertedIndex) -> Self {
        Self { inner: ReadWriteLock::new(index) }
    }
}

impl IndexView for ConcurrentIndex {
    fn exact_search(&self, words: &[String]) -> Vec<SearchResult> {
        ConcurrentIndex::exact_search(self, words)
    }

    fn partial_search(&self, prefixes: &[String]) -> Vec<SearchResult> {
        ConcurrentIndex::partial_search(self, prefixes)
    }

    fn write_json(&self, sink: &mut dyn Write) -> Result<()> {
        let guard = self.inner.read();
        persist::write_index(sink, &guard)
    }

    fn num_words(&self) -> usize {
        ConcurrentIndex::num_words(self)
    }
}

impl<T: IndexView + ?Sized> IndexView for Arc<T> {
    fn exact_search(&self, words: &[String]) -> Vec<SearchResult> {
        (**self).exact_search(words)
    }

    fn partial_search(&self, prefixes: &[String]) -> Vec<SearchResult> {
        (**self).partial_search(prefixes)
    }

    fn write_json(&self, sink: &mut dyn Write) -> Result<()> {
        (**self).write_json(sink)
    }

    fn num_words(&self) -> usize {
        (**self).num_words()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(entries: &[(&str, &str, Position)]) -> InvertedIndex {
        let mut index = InvertedIndex::new();
        for (word, location, position) in entries {
            index.add(word, location, *position);
        }
        index
    }

    #[test]
    fn add_is_idempotent() {
        let mut once = InvertedIndex::new();
        assert!(once.add("cat", "a.txt", 1));
        let mut twice = once.clone();
        assert!(!twice.add("cat", "a.txt", 1));
        assert_eq!(once, twice);
    }

    #[test]
    fn positions_are_sorted() {
        let index = index_of(&[("dog", "b.txt", 9), ("dog", "b.txt", 2), ("dog", "b.txt", 5)]);
        let positions: Vec<_> = index.positions("dog", "b.txt").unwrap().iter().copied().collect();
        assert_eq!(positions, vec![2, 5, 9]);
    }

    #[test]
    fn merge_matches_direct_adds() {
        let entries = [
            ("cat", "a.txt", 1),
            ("dog", "a.txt", 2),
            ("dog", "b.txt", 1),
            ("dog", "b.txt", 2),
            ("cat", "b.txt", 3),
            ("dog", "a.txt", 2),
        ];
        let direct = index_of(&entries);

        let mut left = index_of(&entries[..2]);
        let middle = index_of(&entries[2..4]);
        let right = index_of(&entries[4..]);

        // (left + right) + middle
        let mut other_order = right.clone();
        other_order.merge(left.clone());
        other_order.merge(middle.clone());

        left.merge(middle);
        left.merge(right);

        assert_eq!(left, direct);
        assert_eq!(other_order, direct);
    }

    #[test]
    fn exact_search_aggregates_across_words() {
        let index = index_of(&[
            ("cat", "a.txt", 4),
            ("dog", "a.txt", 2),
            ("dog", "b.txt", 1),
        ]);
        let results = index.exact_search(&["cat", "dog", "bird"]);
        assert_eq!(
            results,
            vec![SearchResult::new(2, 2, "a.txt"), SearchResult::new(1, 1, "b.txt")]
        );
    }

    #[test]
    fn partial_search_stops_at_prefix_boundary() {
        let index = index_of(&[("cat", "a", 1), ("car", "b", 1), ("dog", "c", 1), ("ca", "d", 2)]);
        let results = index.partial_search(&["ca"]);
        let paths: Vec<_> = results.iter().map(SearchResult::path).collect();
        assert_eq!(paths, vec!["a", "b", "d"]);
        assert!(index.partial_search(&["do"]).iter().all(|r| r.path() == "c"));
        assert!(index.partial_search(&["z"]).is_empty());
    }

    #[test]
    fn ranking_orders_by_count_then_position_then_path() {
        let mut results = vec![
            SearchResult::new(1, 1, "C"),
            SearchResult::new(3, 5, "A"),
            SearchResult::new(3, 2, "B"),
            SearchResult::new(3, 2, "AB"),
        ];
        results.sort();
        let paths: Vec<_> = results.iter().map(SearchResult::path).collect();
        assert_eq!(paths, vec!["AB", "B", "A", "C"]);
    }

    #[test]
    fn duplicate_query_words_count_twice() {
        let index = index_of(&[("cat", "a", 1)]);
        let results = index.exact_search(&["cat", "cat"]);
        assert_eq!(results[0].count(), 2);
    }

    #[test]
    fn concurrent_index_agrees_with_sequential() {
        let concurrent = ConcurrentIndex::new();
        concurrent.add("cat", "a", 1);
        concurrent.merge(index_of(&[("car", "b", 3), ("cat", "a", 2)]));
        let expected = index_of(&[("cat", "a", 1), ("cat", "a", 2), ("car", "b", 3)]);
        assert_eq!(concurrent.snapshot(), expected);
        assert_eq!(concurrent.partial_search(&["ca"]), expected.partial_search(&["ca"]));
    }
}
