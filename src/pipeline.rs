//! Shared front half of every command: source bytes to parsed document.

use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::extract::{parse_document, ExtractionRules};
use crate::source::{decode_document, document_digest, load_document};

/// Load (or fetch) the configured document and parse it with `rules`.
pub async fn prepare_document(config: &Config, rules: &ExtractionRules) -> Result<Document> {
    let bytes = load_document(&config.source).await?;
    log::info!("Document sha256 {} ({} bytes)", document_digest(&bytes), bytes.len());

    let html = decode_document(&bytes);
    let document = parse_document(&html, rules)?;
    log::debug!("Parsed {} structural nodes", document.nodes().len());
    Ok(document)
}
