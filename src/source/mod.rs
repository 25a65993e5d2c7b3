//! Document source: read the cached specification, or fetch and cache it.

use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::{Result, StixrelError};

/// Return the raw document bytes, fetching them only when no cache file exists.
///
/// On first fetch the bytes are persisted to `cache_path` unchanged.
pub async fn load_document(source: &SourceConfig) -> Result<Vec<u8>> {
    if source.cache_path.is_file() {
        log::info!("Reading cached document {}", source.cache_path.display());
        return std::fs::read(&source.cache_path).map_err(StixrelError::Io);
    }

    log::info!("No cached copy at {}, fetching {}", source.cache_path.display(), source.url);
    let bytes = fetch_document(&source.url, Duration::from_secs(source.timeout_secs)).await?;
    write_cache(&source.cache_path, &bytes)?;
    log::info!("Cached {} bytes to {}", bytes.len(), source.cache_path.display());

    Ok(bytes)
}

/// GET the document, following redirects. Any non-success status is fatal.
pub async fn fetch_document(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let url = url::Url::parse(url)
        .map_err(|e| StixrelError::Config(format!("invalid source url {}: {}", url, e)))?;

    let client = Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    Ok(bytes.to_vec())
}

fn write_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Decode document bytes to text.
///
/// UTF-8 is used as-is. Anything else is treated as Windows-1252, which is what
/// the published HTML uses; its 0x80-0x9F range maps to punctuation such as the
/// em-dash placeholder (0x97) rather than to C1 control characters.
pub fn decode_document(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("Document is not valid UTF-8, decoding as Windows-1252");
            bytes.iter().map(|&b| windows_1252_char(b)).collect()
        }
    }
}

fn windows_1252_char(byte: u8) -> char {
    const C1: [char; 32] = [
        '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}',
        '\u{017D}', '\u{008F}', '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => C1[(byte - 0x80) as usize],
        _ => char::from(byte),
    }
}

/// SHA256 of the raw document, as lowercase hex
pub fn document_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
