//! Upload resolution: turn a user-supplied path or URL into an
//! [`UploadedDocument`].
//!
//! Bytes are read fully into memory; the extractors that need a file on disk
//! write their own scratch copy. The upload name is the file name component
//! (or the last URL path segment), which is what extension-based
//! classification and per-session deduplication key on.

use crate::document::UploadedDocument;
use crate::error::DocChatError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Name given to a download whose URL has no usable file name.
const FALLBACK_DOWNLOAD_NAME: &str = "download";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` (local path or HTTP/HTTPS URL) as an upload.
pub async fn load_upload(input: &str, timeout_secs: u64) -> Result<UploadedDocument, DocChatError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<UploadedDocument, DocChatError> {
    let path = PathBuf::from(path_str);
    if path_str.trim().is_empty() {
        return Err(DocChatError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => DocChatError::FileNotFound { path: path.clone() },
        ErrorKind::PermissionDenied => DocChatError::PermissionDenied { path: path.clone() },
        _ => DocChatError::ReadFailed {
            path: path.clone(),
            source: e,
        },
    })?;

    let name = file_name(&path).ok_or_else(|| DocChatError::InvalidInput {
        input: path_str.to_string(),
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(UploadedDocument::new(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, DocChatError> {
    info!("Downloading {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| DocChatError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocChatError::HttpClient(e.to_string()))?;

    let map_send = |e: reqwest::Error| {
        if e.is_timeout() {
            DocChatError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocChatError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(parsed.clone()).send().await.map_err(map_send)?;
    if !response.status().is_success() {
        return Err(DocChatError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_send)?;
    let name = url_file_name(&parsed);
    info!("Downloaded {} ({} bytes)", name, bytes.len());

    Ok(UploadedDocument::new(name, bytes.to_vec()))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

/// Last non-empty path segment of the URL, or a generic name.
pub fn url_file_name(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.to_string())
        .unwrap_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_names() {
        let name = |u: &str| url_file_name(&reqwest::Url::parse(u).unwrap());
        assert_eq!(name("https://example.com/files/report.pdf"), "report.pdf");
        assert_eq!(name("https://example.com/files/notes.txt/"), "notes.txt");
        assert_eq!(name("https://example.com/"), "download");
    }

    #[tokio::test]
    async fn reads_local_file_with_its_name() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"hello world").unwrap();

        let doc = load_upload(file.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.raw_bytes, b"hello world");
        assert!(doc.name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_upload("/nonexistent/doc2chat-test/notes.txt", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DocChatError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn directory_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let err = load_upload(path, 5).await.unwrap_err();
        assert!(!matches!(err, DocChatError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        assert!(matches!(
            load_upload("  ", 5).await,
            Err(DocChatError::InvalidInput { .. })
        ));
    }
}
