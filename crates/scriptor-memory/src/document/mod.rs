pub mod loader;
pub mod splitter;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub use loader::{LatexLoader, clean_latex};
pub use splitter::{SplitterConfig, chunk_text};
pub use types::{Chunk, Document};

use crate::error::MemoryError;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Document, MemoryError>> + Send + '_>,
    >;
}

/// Resolve `pattern` and load every matching file, ordered by file name.
///
/// # Errors
///
/// Returns [`MemoryError::Configuration`] if the pattern is invalid or matches
/// no files, or the first load error encountered.
pub async fn load_corpus(
    pattern: &str,
    loader: &impl DocumentLoader,
) -> Result<Vec<Document>, MemoryError> {
    let paths = resolve_pattern(pattern)?;
    tracing::debug!(pattern, files = paths.len(), "resolved corpus pattern");

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        documents.push(loader.load(path).await?);
    }
    disambiguate_titles(&mut documents)?;

    tracing::info!(pattern, documents = documents.len(), "corpus loaded");
    Ok(documents)
}

fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>, MemoryError> {
    let entries = glob::glob(pattern).map_err(|e| {
        MemoryError::Configuration(format!("invalid corpus pattern {pattern:?}: {e}"))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("skipping unreadable corpus entry: {e}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    if paths.is_empty() {
        return Err(MemoryError::Configuration(format!(
            "no documents match corpus pattern {pattern:?}"
        )));
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    Ok(paths)
}

/// Retitle documents whose titles collide with the path relative to the
/// closest directory their sources share, so chunk references stay unique.
///
/// # Errors
///
/// Returns [`MemoryError::Configuration`] if titles still collide afterwards.
fn disambiguate_titles(documents: &mut [Document]) -> Result<(), MemoryError> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, doc) in documents.iter().enumerate() {
        groups.entry(doc.title.clone()).or_default().push(i);
    }

    for (title, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
        let sources: Vec<&Path> = members
            .iter()
            .map(|&i| documents[i].source.as_path())
            .collect();
        let base = common_ancestor(&sources);
        let renamed: Vec<String> = sources
            .iter()
            .map(|&source| {
                source
                    .strip_prefix(&base)
                    .unwrap_or(source)
                    .display()
                    .to_string()
            })
            .collect();
        tracing::warn!(%title, count = members.len(), "duplicate document titles, using relative paths");
        for (&i, new_title) in members.iter().zip(renamed) {
            documents[i].title = new_title;
        }
    }

    let mut seen = HashSet::new();
    for doc in documents.iter() {
        if !seen.insert(doc.title.as_str()) {
            return Err(MemoryError::Configuration(format!(
                "duplicate document title {:?} ({})",
                doc.title,
                doc.source.display()
            )));
        }
    }
    Ok(())
}

/// Deepest directory containing every path.
fn common_ancestor(paths: &[&Path]) -> PathBuf {
    let mut base: Option<PathBuf> = None;
    for path in paths {
        let parent = path.parent().unwrap_or(Path::new(""));
        base = Some(match base {
            None => parent.to_path_buf(),
            Some(current) => current
                .components()
                .zip(parent.components())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    base.unwrap_or_default()
}
