//! Document input

use std::path::Path;

use anyhow::Context;
use sprig_core::{Document, DocumentFormat};

/// Read and parse a `.json` or `.toml` document
pub async fn load_document(path: &Path) -> anyhow::Result<Document> {
    let format = DocumentFormat::from_path(path).with_context(|| {
        format!(
            "Cannot tell the format of {}: expected a .json or .toml file",
            path.display()
        )
    })?;

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let document = Document::parse(&text, format)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    tracing::info!(
        "Loaded {} nodes from {}",
        document.graph.len(),
        path.display()
    );
    Ok(document)
}
