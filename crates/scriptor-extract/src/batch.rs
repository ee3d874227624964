use std::path::{Path, PathBuf};

use crate::error::ExtractError;
use crate::metadata::extract_metadata;

/// Extract metadata from every `.tex` file directly inside `input` and write
/// one pretty-printed `<stem>.json` per paper into `output`.
///
/// Files are processed in name order; `output` is created if missing.
/// Returns the written paths.
///
/// # Errors
///
/// Returns [`ExtractError::NoInput`] if `input` holds no `.tex` files, or the
/// first IO or serialization error.
pub async fn extract_dir(input: &Path, output: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut sources = Vec::new();
    let mut entries = tokio::fs::read_dir(input)
        .await
        .map_err(ExtractError::io(input))?;
    while let Some(entry) = entries.next_entry().await.map_err(ExtractError::io(input))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tex") && path.is_file() {
            sources.push(path);
        }
    }
    if sources.is_empty() {
        return Err(ExtractError::NoInput(input.to_path_buf()));
    }
    sources.sort();

    tokio::fs::create_dir_all(output)
        .await
        .map_err(ExtractError::io(output))?;

    let mut written = Vec::with_capacity(sources.len());
    for source in &sources {
        tracing::info!(source = %source.display(), "extracting metadata");
        let bytes = tokio::fs::read(source)
            .await
            .map_err(ExtractError::io(source.as_path()))?;
        let metadata = extract_metadata(&String::from_utf8_lossy(&bytes));

        let mut name = source.file_stem().unwrap_or_default().to_os_string();
        name.push(".json");
        let target = output.join(name);
        let json = serde_json::to_string_pretty(&metadata)?;
        tokio::fs::write(&target, json)
            .await
            .map_err(ExtractError::io(target.as_path()))?;

        tracing::info!(target = %target.display(), "saved extracted metadata");
        written.push(target);
    }
    Ok(written)
}
