use condense_common::{CondenseError, Result};
use condense_mapreduce::Document;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// File extensions picked up when a directory is given
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Path meaning "read standard input"
pub const STDIN_PATH: &str = "-";

/// Read documents in the order given
///
/// Directories contribute their text files (one level deep, sorted by name).
/// `-` reads standard input.
pub async fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for path in paths {
        if path.as_os_str() == STDIN_PATH {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            documents.push(Document::with_source(text, "<stdin>"));
            continue;
        }

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            CondenseError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;

        if metadata.is_dir() {
            for file in text_files_in(path).await? {
                documents.push(read_document(&file).await?);
            }
        } else {
            documents.push(read_document(path).await?);
        }
    }

    debug!("Loaded {} document(s)", documents.len());
    Ok(documents)
}

async fn read_document(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        CondenseError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(Document::with_source(text, path.display().to_string()))
}

async fn text_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if is_text_file(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        warn!("No text files found in {}", dir.display());
    }

    files.sort();
    Ok(files)
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
