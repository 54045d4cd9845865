//! Breadth-first crawl bounded by a frontier budget.
//!
//! Fetching and HTML handling live behind [`PageFetcher`]; this module only
//! decides which URLs get visited and how their words reach the index.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::index::{ConcurrentIndex, InvertedIndex, Position};
use crate::pool::TaskPool;

/// Maximum number of URLs admitted per crawler, seed included.
pub const DEFAULT_FRONTIER_CAPACITY: usize = 50;

/// A fetched page reduced to what the crawl needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Lower-case, punctuation-free tokens in document order.
    pub words: Vec<String>,
    /// Absolute outbound links in document order.
    pub links: Vec<String>,
}

/// Retrieves a page and splits it into words and links.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    fn fetch(&self, url: &str) -> Result<FetchedPage> {
        (**self).fetch(url)
    }
}

/// Every URL ever admitted, bounded by `capacity`.
#[derive(Debug, Clone)]
pub struct Frontier {
    seen: HashSet<String>,
    capacity: usize,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self { seen: HashSet::new(), capacity }
    }

    /// Admit `url` unless it was seen before or the frontier is full.
    pub fn admit(&mut self, url: &str) -> bool {
        if self.is_full() || self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_owned())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn is_full(&self) -> bool {
        self.seen.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTIER_CAPACITY)
    }
}

/// Crawls from a seed URL into an index.
pub trait WebCrawler {
    type Index;

    /// Crawl everything reachable from `seed` within the frontier budget.
    /// Returns the frontier size afterwards. The frontier is kept across
    /// calls, so a later seed never re-fetches an earlier page.
    fn crawl(&mut self, index: &mut Self::Index, seed: &str) -> Result<usize>;
}

/// Index `words` under `url`, positions starting at 1.
pub fn index_page(index: &mut InvertedIndex, url: &str, words: &[String]) {
    let mut position: Position = 0;
    for word in words.iter().filter(|word| !word.is_empty()) {
        position += 1;
        index.add(word, url, position);
    }
}

/// Single-threaded crawl driven by a FIFO queue.
pub struct SequentialCrawler<F> {
    fetcher: F,
    frontier: Frontier,
}

impl<F: PageFetcher> SequentialCrawler<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_capacity(fetcher, DEFAULT_FRONTIER_CAPACITY)
    }

    pub fn with_capacity(fetcher: F, capacity: usize) -> Self {
        Self { fetcher, frontier: Frontier::new(capacity) }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }
}

impl<F: PageFetcher> WebCrawler for SequentialCrawler<F> {
    type Index = InvertedIndex;

    fn crawl(&mut self, index: &mut InvertedIndex, seed: &str) -> Result<usize> {
        if !self.frontier.admit(seed) {
            tracing::warn!(seed, "seed already visited or frontier full, not crawling");
            return Ok(self.frontier.len());
        }

        let mut queue = VecDeque::from([seed.to_owned()]);
        while let Some(url) = queue.pop_front() {
            let page = match self.fetcher.fetch(&url) {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "skipping page");
                    continue;
                }
            };
            index_page(index, &url, &page.words);

            for link in page.links {
                if self.frontier.is_full() {
                    break;
                }
                if self.frontier.admit(&link) {
                    queue.push_back(link);
                }
            }
            tracing::debug!(url = %url, words = page.words.len(), "crawled page");
        }

        tracing::info!(seed, pages = self.frontier.len(), "crawl complete");
        Ok(self.frontier.len())
    }
}

/// Crawl in which every page is one pool job.
pub struct PooledCrawler {
    fetcher: Arc<dyn PageFetcher>,
    frontier: Arc<Mutex<Frontier>>,
    pool: Arc<TaskPool>,
}

impl PooledCrawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, pool: Arc<TaskPool>) -> Self {
        Self::with_capacity(fetcher, pool, DEFAULT_FRONTIER_CAPACITY)
    }

    pub fn with_capacity(fetcher: Arc<dyn PageFetcher>, pool: Arc<TaskPool>, capacity: usize) -> Self {
        Self {
            fetcher,
            frontier: Arc::new(Mutex::new(Frontier::new(capacity))),
            pool,
        }
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.lock().len()
    }
}

/// State shared by the jobs of one crawl.
struct CrawlContext {
    fetcher: Arc<dyn PageFetcher>,
    frontier: Arc<Mutex<Frontier>>,
    pool: Arc<TaskPool>,
    index: Arc<ConcurrentIndex>,
}

impl CrawlContext {
    fn schedule(self: &Arc<Self>, url: String) -> Result<()> {
        tracing::debug!(url = %url, "minion created");
        let context = Arc::clone(self);
        self.pool.submit(move || context.visit(url))
    }

    fn visit(self: Arc<Self>, url: String) {
        let page = match self.fetcher.fetch(&url) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "skipping page");
                return;
            }
        };

        {
            // admission and submission happen under one frontier lock
            let mut frontier = self.frontier.lock();
            for link in page.links {
                if frontier.is_full() {
                    break;
                }
                if frontier.admit(&link) {
                    if let Err(err) = self.schedule(link) {
                        tracing::error!(error = %err, "unable to schedule page");
                    }
                }
            }
        }

        let mut local = InvertedIndex::new();
        index_page(&mut local, &url, &page.words);
        self.index.merge(local);
        tracing::debug!(url = %url, words = page.words.len(), "minion finished");
    }
}

impl WebCrawler for PooledCrawler {
    type Index = Arc<ConcurrentIndex>;

    fn crawl(&mut self, index: &mut Arc<ConcurrentIndex>, seed: &str) -> Result<usize> {
        let context = Arc::new(CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            frontier: Arc::clone(&self.frontier),
            pool: Arc::clone(&self.pool),
            index: Arc::clone(index),
        });

        let admitted = self.frontier.lock().admit(seed);
        if !admitted {
            tracing::warn!(seed, "seed already visited or frontier full, not crawling");
            return Ok(self.frontier_len());
        }
        context.schedule(seed.to_owned())?;

        self.pool.await_idle();
        let pages = self.frontier_len();
        tracing::info!(seed, pages, "crawl complete");
        Ok(pages)
    }
}
