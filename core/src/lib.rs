//! Word-location index over text files and crawled pages.
//!
//! Each role (building, crawling, querying) has a sequential implementation
//! that works on an [`InvertedIndex`] directly and a pooled one that works on
//! a shared [`ConcurrentIndex`]; both produce the same index contents and the
//! same ranked results.

pub mod builder;
pub mod crawler;
pub mod error;
pub mod index;
pub mod lock;
pub mod persist;
pub mod pool;
pub mod query;
pub mod tokenizer;

pub use builder::{FileIndexer, IndexBuilder, PooledFileIndexer};
pub use crawler::{FetchedPage, Frontier, PageFetcher, PooledCrawler, SequentialCrawler, WebCrawler, DEFAULT_FRONTIER_CAPACITY};
pub use error::{Result, SearchError};
pub use index::{ConcurrentIndex, IndexView, InvertedIndex, Position, SearchResult};
pub use lock::ReadWriteLock;
pub use persist::QueryResults;
pub use pool::TaskPool;
pub use query::{PooledQueryEngine, QueryEngine, SequentialQueryEngine};
