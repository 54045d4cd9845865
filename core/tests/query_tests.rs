use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use wordindex_core::builder::location_of;
use wordindex_core::persist::{read_index, write_results};
use wordindex_core::{
    ConcurrentIndex, FileIndexer, IndexBuilder, IndexView, InvertedIndex, PooledQueryEngine, QueryEngine,
    SearchError, SearchResult, SequentialQueryEngine, TaskPool,
};

fn corpus(root: &Path) -> InvertedIndex {
    fs::write(root.join("a.txt"), "cat car dog\ncat").unwrap();
    fs::write(root.join("b.txt"), "dog dog dog cart").unwrap();
    fs::write(root.join("c.txt"), "car catalog").unwrap();
    let mut index = InvertedIndex::new();
    FileIndexer::new().build(&mut index, root).unwrap();
    index
}

fn query_file(root: &Path) -> std::path::PathBuf {
    let path = root.join("queries.text");
    fs::write(&path, "Dog\ncar CAT\ncat car\n\n  ...  \nca\nzebra\ncat cat\n").unwrap();
    path
}

#[test]
fn exact_queries_are_ranked() {
    let dir = tempdir().unwrap();
    let index = corpus(dir.path());
    let results = SequentialQueryEngine::new().query(&index, &query_file(dir.path()), true).unwrap();

    let keys: Vec<_> = results.keys().cloned().collect();
    assert_eq!(keys, vec!["ca", "car cat", "cat cat", "dog", "zebra"]);

    let a = location_of(&dir.path().join("a.txt"));
    let b = location_of(&dir.path().join("b.txt"));
    let c = location_of(&dir.path().join("c.txt"));

    assert_eq!(results["dog"], vec![SearchResult::new(3, 1, b.clone()), SearchResult::new(1, 3, a.clone())]);
    assert_eq!(results["car cat"], vec![SearchResult::new(3, 1, a.clone()), SearchResult::new(1, 1, c)]);
    assert_eq!(results["cat cat"], vec![SearchResult::new(4, 1, a)]);
    assert!(results["ca"].is_empty());
    assert!(results["zebra"].is_empty());
}

#[test]
fn partial_queries_match_prefixes() {
    let dir = tempdir().unwrap();
    let index = corpus(dir.path());
    let results = SequentialQueryEngine::new().query(&index, &query_file(dir.path()), false).unwrap();

    let a = location_of(&dir.path().join("a.txt"));
    let b = location_of(&dir.path().join("b.txt"));
    let c = location_of(&dir.path().join("c.txt"));

    // car, cart, cat, catalog
    assert_eq!(
        results["ca"],
        vec![
            SearchResult::new(3, 1, a),
            SearchResult::new(2, 1, c),
            SearchResult::new(1, 4, b),
        ]
    );
}

#[test]
fn pooled_and_sequential_results_agree() {
    let dir = tempdir().unwrap();
    let index = corpus(dir.path());
    let queries = query_file(dir.path());

    let pool = Arc::new(TaskPool::new(4).unwrap());
    let shared = Arc::new(ConcurrentIndex::from(index.clone()));
    let mut pooled = PooledQueryEngine::new(pool.clone());

    for exact in [true, false] {
        let expected = SequentialQueryEngine::new().query(&index, &queries, exact).unwrap();
        let actual = pooled.query(&shared, &queries, exact).unwrap();
        assert_eq!(expected, actual);

        let mut left = Vec::new();
        let mut right = Vec::new();
        write_results(&mut left, &expected).unwrap();
        write_results(&mut right, &actual).unwrap();
        assert_eq!(left, right);
    }
    pool.shutdown();
}

#[test]
fn missing_query_file_fails_the_operation() {
    let index = InvertedIndex::new();
    let err = SequentialQueryEngine::new()
        .query(&index, Path::new("/no/such/queries.txt"), true)
        .unwrap_err();
    assert!(matches!(err, SearchError::QueryFile { .. }));

    let pool = Arc::new(TaskPool::new(2).unwrap());
    let err = PooledQueryEngine::new(pool)
        .query(&Arc::new(ConcurrentIndex::new()), Path::new("/no/such/queries.txt"), false)
        .unwrap_err();
    assert!(matches!(err, SearchError::QueryFile { .. }));
}

#[test]
fn index_json_round_trips() {
    let dir = tempdir().unwrap();
    let index = corpus(dir.path());

    let mut json = Vec::new();
    index.write_json(&mut json).unwrap();
    let parsed = read_index(json.as_slice()).unwrap();
    assert_eq!(parsed, index);

    let shared = ConcurrentIndex::from(index.clone());
    let mut shared_json = Vec::new();
    shared.write_json(&mut shared_json).unwrap();
    assert_eq!(json, shared_json);
}

#[test]
fn index_file_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let index = corpus(dir.path());
    let path = dir.path().join("index.json");

    wordindex_core::persist::write_file(&path, |sink| index.write_json(sink)).unwrap();
    let parsed = wordindex_core::persist::read_index_file(&path).unwrap();
    assert_eq!(parsed, index);
}
