use crate::error::{Result, SearchError};
use crate::index::{InvertedIndex, SearchResult};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Ranked results keyed by normalized query text.
pub type QueryResults = BTreeMap<String, Vec<SearchResult>>;

fn write_pretty<T: Serialize + ?Sized>(sink: &mut dyn Write, value: &T) -> Result<()> {
    let mut ser = Serializer::with_formatter(&mut *sink, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    sink.write_all(b"\n").map_err(SearchError::Write)?;
    Ok(())
}

/// `{word: {location: [positions...]}}`, tab indented.
pub fn write_index(sink: &mut dyn Write, index: &InvertedIndex) -> Result<()> {
    write_pretty(sink, index)
}

/// `{query: [{"where", "count", "index"}...]}`, tab indented.
pub fn write_results(sink: &mut dyn Write, results: &QueryResults) -> Result<()> {
    write_pretty(sink, results)
}

/// Parse index JSON as produced by [`write_index`]. Empty entries are dropped.
pub fn read_index<R: Read>(source: R) -> Result<InvertedIndex> {
    let mut index: InvertedIndex = serde_json::from_reader(source)?;
    index.prune();
    Ok(index)
}

pub fn read_index_file(path: &Path) -> Result<InvertedIndex> {
    let file = File::open(path).map_err(|source| SearchError::Read { path: path.to_path_buf(), source })?;
    read_index(BufReader::new(file))
}

/// Create `path` and run `render` against a buffered writer on it.
pub fn write_file<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let output = |source| SearchError::Output { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(output)?;
    let mut writer = BufWriter::new(file);
    render(&mut writer).map_err(|err| match err {
        SearchError::Write(source) => output(source),
        other => other,
    })?;
    writer.flush().map_err(output)?;
    tracing::debug!(path = %path.display(), "wrote output");
    Ok(())
}

pub fn write_results_file(path: &Path, results: &QueryResults) -> Result<()> {
    write_file(path, |sink| write_results(sink, results))
}
