//! Pipeline sources
//!
//! Loads a pipeline document from a local path or an HTTP(S) URL.

use anyhow::{Context, Result};
use sluice_core::export::opener::is_url;
use sluice_core::export::{Format, Opener};
use tokio::io::AsyncReadExt;

/// Read a whole pipeline document and the format it is written in
///
/// An explicit `format` wins. Otherwise URLs need a `.json`, `.yml` or
/// `.yaml` suffix while local files fall back to YAML.
pub async fn load(opener: &Opener, source: &str, format: Option<&str>) -> Result<(Vec<u8>, Format)> {
    if is_url(source) {
        tracing::debug!("Fetching {} (timeout: {:?})", source, opener.timeout());
        return match format {
            Some(hint) => opener
                .read_url(source, hint)
                .await
                .with_context(|| format!("Failed to fetch {}", source)),
            None => {
                let (mut reader, format) = opener
                    .open_path(source)
                    .await
                    .with_context(|| format!("Failed to open {}", source))?;
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .await
                    .with_context(|| format!("Failed to read {}", source))?;
                tracing::debug!("Fetched {} bytes of {} from {}", bytes.len(), format, source);
                Ok((bytes, format))
            }
        };
    }

    let (bytes, detected) = opener
        .read_file(source)
        .await
        .with_context(|| format!("Failed to read pipeline file: {}", source))?;

    let format = match format {
        Some(tag) => Format::from_path(tag).with_context(|| format!("Unknown format: {}", tag))?,
        None => detected,
    };
    tracing::debug!("Read {} bytes of {} from {}", bytes.len(), format, source);
    Ok((bytes, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"name":"build"}"#).unwrap();
        let path = path.to_str().unwrap();

        let opener = Opener::new().unwrap();
        let (bytes, format) = load(&opener, path, None).await.unwrap();
        assert_eq!(format, Format::Json);
        assert_eq!(bytes, br#"{"name":"build"}"#);

        let (_, format) = load(&opener, path, Some("yml")).await.unwrap();
        assert_eq!(format, Format::Yaml);

        assert!(load(&opener, path, Some("xml")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let opener = Opener::new().unwrap();
        let err = load(&opener, "/nonexistent/pipeline.yml", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pipeline.yml"));
    }
}
