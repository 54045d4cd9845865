use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use wordindex_core::persist::{self, QueryResults};
use wordindex_core::{
    ConcurrentIndex, FileIndexer, IndexBuilder, IndexView, InvertedIndex, PageFetcher, PooledCrawler,
    PooledFileIndexer, PooledQueryEngine, QueryEngine, SequentialCrawler, SequentialQueryEngine, TaskPool, WebCrawler,
    DEFAULT_FRONTIER_CAPACITY,
};
use wordindex_crawler::{FetchConfig, HttpFetcher};

/// Worker count used when `--threads` is given without a value.
const DEFAULT_THREADS: &str = "5";

#[derive(Parser, Debug)]
#[command(name = "wordindex")]
#[command(about = "Build a word-location index from files or a web crawl and run ranked queries", long_about = None)]
struct Cli {
    /// Directory to index recursively (*.txt files)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Seed URL for a breadth-first crawl
    #[arg(long)]
    url: Option<String>,
    /// Maximum number of URLs a crawl may visit
    #[arg(long, default_value_t = DEFAULT_FRONTIER_CAPACITY)]
    limit: usize,
    /// Worker threads; single-threaded when absent, values below 1 become 1
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_THREADS, allow_negative_numbers = true)]
    threads: Option<i64>,
    /// Write the index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,
    /// Query file evaluated with exact word matching
    #[arg(long)]
    exact: Option<PathBuf>,
    /// Query file evaluated with prefix matching
    #[arg(long)]
    query: Option<PathBuf>,
    /// Write the query results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,
    /// Request timeout in seconds for crawled pages
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
}

/// One implementation per role, all working on the same kind of index.
struct Components<I> {
    index: I,
    builder: Box<dyn IndexBuilder<Index = I>>,
    crawler: Box<dyn WebCrawler<Index = I>>,
    queries: Box<dyn QueryEngine<Index = I>>,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpFetcher::new(FetchConfig {
            timeout: std::time::Duration::from_secs(cli.timeout_secs),
            ..FetchConfig::default()
        })
        .context("unable to create http client")?,
    );

    match cli.threads {
        None => {
            let components = Components {
                index: InvertedIndex::new(),
                builder: Box::new(FileIndexer::new()),
                crawler: Box::new(SequentialCrawler::with_capacity(fetcher, cli.limit)),
                queries: Box::new(SequentialQueryEngine::new()),
            };
            run(&cli, components);
        }
        Some(requested) => {
            let workers = worker_count(requested);
            let pool = Arc::new(TaskPool::new(workers).context("unable to start worker pool")?);
            tracing::info!(workers, "running with worker pool");
            let components = Components {
                index: Arc::new(ConcurrentIndex::new()),
                builder: Box::new(PooledFileIndexer::new(pool.clone())),
                crawler: Box::new(PooledCrawler::with_capacity(fetcher, pool.clone(), cli.limit)),
                queries: Box::new(PooledQueryEngine::new(pool.clone())),
            };
            run(&cli, components);
            pool.shutdown();
        }
    }
    Ok(())
}

/// Pool size for a `--threads` value; anything below 1 runs one worker.
fn worker_count(requested: i64) -> usize {
    usize::try_from(requested.max(1)).unwrap_or(usize::MAX)
}

/// Run every requested stage. A failing stage is reported and the remaining
/// stages still run.
fn run<I: IndexView>(cli: &Cli, mut components: Components<I>) {
    if let Some(dir) = &cli.dir {
        if let Err(err) = components.builder.build(&mut components.index, dir) {
            report("--dir", &err);
        }
    }

    if let Some(seed) = &cli.url {
        if let Err(err) = components.crawler.crawl(&mut components.index, seed) {
            report("--url", &err);
        }
    }

    if let Some(path) = &cli.index {
        if let Err(err) = write_index(&components.index, path) {
            report("--index", &err);
        }
    }

    let mut results = QueryResults::new();
    for (flag, path, exact) in [("--exact", &cli.exact, true), ("--query", &cli.query, false)] {
        let Some(path) = path else { continue };
        match components.queries.query(&components.index, path, exact) {
            Ok(found) => results.extend(found),
            Err(err) => report(flag, &err),
        }
    }

    if let Some(path) = &cli.results {
        if let Err(err) = persist::write_results_file(path, &results) {
            report("--results", &err);
        }
    }
}

fn write_index<I: IndexView>(index: &I, path: &Path) -> wordindex_core::Result<()> {
    persist::write_file(path, |sink| index.write_json(sink))?;
    tracing::info!(path = %path.display(), words = index.num_words(), "index written");
    Ok(())
}

fn report(flag: &str, err: &dyn std::error::Error) {
    tracing::error!(flag, error = %err, "stage failed");
    eprintln!("{flag}: {err}");
}
