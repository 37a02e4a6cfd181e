//! Source opener
//!
//! Resolves a local path or an HTTP(S) URL to pipeline bytes or to a
//! readable stream, together with the format inferred from the name.
//! Remote reads share one client whose timeout bounds connection and body
//! read together.

use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use super::format::Format;
use super::{ExportError, Result};

/// Deadline applied to remote sources unless configured otherwise
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Readable pipeline source; closed when dropped
pub type SourceReader = Pin<Box<dyn AsyncRead + Send>>;

/// Opens pipeline sources from disk or over HTTP
#[derive(Debug, Clone)]
pub struct Opener {
    client: Client,
    timeout: Duration,
}

impl Opener {
    /// Creates an opener with the default 10 second remote timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REMOTE_TIMEOUT)
    }

    /// Creates an opener with a custom remote timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ExportError::Client)?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads a local file
    ///
    /// The format is YAML unless the file name ends in `.json`.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<(Vec<u8>, Format)> {
        let path = path.as_ref();
        let format = if path.to_string_lossy().ends_with(".json") {
            Format::Json
        } else {
            Format::Yaml
        };

        let bytes = tokio::fs::read(path).await.map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok((bytes, format))
    }

    /// Opens a local file for streaming
    pub async fn open_file(&self, path: impl AsRef<Path>) -> Result<SourceReader> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ExportError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Box::pin(file))
    }

    /// Downloads a remote document
    ///
    /// `format_hint` is resolved before any network I/O takes place.
    pub async fn read_url(&self, url: &str, format_hint: &str) -> Result<(Vec<u8>, Format)> {
        let format = Format::from_path(format_hint)?;

        tracing::debug!("Fetching {} as {}", url, format);
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|source| ExportError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok((bytes.to_vec(), format))
    }

    /// Opens a remote document for streaming
    pub async fn open_url(&self, url: &str) -> Result<SourceReader> {
        let response = self.get(url).await?;
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(stream)))
    }

    /// Opens a URL or a local file, inferring the format from its suffix
    pub async fn open_path(&self, path: &str) -> Result<(SourceReader, Format)> {
        if is_url(path) {
            let url = Url::parse(path).map_err(|source| ExportError::InvalidUrl {
                url: path.to_string(),
                source,
            })?;
            let format = Format::from_file_name(url.path())?;
            let reader = self.open_url(path).await?;
            Ok((reader, format))
        } else {
            let format = Format::from_file_name(path)?;
            let reader = self.open_file(path).await?;
            Ok((reader, format))
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let http_err = |source| ExportError::Http {
            url: url.to_string(),
            source,
        };

        self.client
            .get(url)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)
    }
}

/// True for absolute `http` and `https` URLs
pub fn is_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn read_all(mut reader: SourceReader) -> String {
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        out
    }

    /// Accepts connections and never answers
    async fn silent_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/pipeline.yml"));
        assert!(is_url("http://localhost:8080/p.json"));
        assert!(!is_url("pipeline.yml"));
        assert!(!is_url("/tmp/pipeline.yml"));
        assert!(!is_url("ftp://example.com/pipeline.yml"));
    }

    #[test]
    fn test_default_timeout() {
        let opener = Opener::new().unwrap();
        assert_eq!(opener.timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_read_file_defaults_to_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("pipeline");
        std::fs::write(&yaml, "name: build\n").unwrap();
        let json = dir.path().join("pipeline.json");
        std::fs::write(&json, r#"{"name":"build"}"#).unwrap();

        let opener = Opener::new().unwrap();
        let (bytes, format) = opener.read_file(&yaml).await.unwrap();
        assert_eq!(format, Format::Yaml);
        assert_eq!(bytes, b"name: build\n");

        let (_, format) = opener.read_file(&json).await.unwrap();
        assert_eq!(format, Format::Json);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let opener = Opener::new().unwrap();
        let err = opener.read_file("/nonexistent/pipeline.yml").await.unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[tokio::test]
    async fn test_open_path_local_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "name: build\nstages: [compile]\n").unwrap();

        let opener = Opener::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let (reader, format) = opener.open_path(&path).await.unwrap();

        assert_eq!(format, Format::Yaml);
        assert_eq!(read_all(reader).await, "name: build\nstages: [compile]\n");
    }

    #[tokio::test]
    async fn test_open_path_without_suffix_is_unsupported() {
        let opener = Opener::new().unwrap();
        let err = opener.open_path("/tmp/Pipelinefile").await.err().unwrap();
        assert!(matches!(err, ExportError::UnsupportedFormat));
    }

    #[tokio::test]
    async fn test_read_url_rejects_hint_before_connecting() {
        // Nothing listens on port 1; an unsupported hint must fail first.
        let opener = Opener::new().unwrap();
        let err = opener
            .read_url("http://127.0.0.1:1/pipeline", "xml")
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat));
    }

    #[tokio::test]
    async fn test_open_path_remote_times_out() {
        let addr = silent_server().await;
        let opener = Opener::with_timeout(Duration::from_millis(300)).unwrap();

        let started = tokio::time::Instant::now();
        let err = opener
            .open_path(&format!("http://{addr}/pipeline.yml"))
            .await
            .err()
            .unwrap();

        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_read_url_times_out() {
        let addr = silent_server().await;
        let opener = Opener::with_timeout(Duration::from_millis(300)).unwrap();

        let err = opener
            .read_url(&format!("http://{addr}/pipeline"), "yml")
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }
}
