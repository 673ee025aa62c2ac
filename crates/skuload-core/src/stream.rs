//! HTTP streaming with gzip decompression and read timeout.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall detection,
//! but presents a sync `Read` so the CSV parser can pull straight from the socket.

use std::io::{self, BufReader, Read};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::task::Context;
use std::time::Duration;

use flate2::read::MultiGzDecoder;
use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::Retryable;

/// HTTP settings for opening the source feed
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// No body bytes for this long = stall
    pub read_timeout: Duration,
    /// Retries after the first request (3 → at most 4 requests)
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each subsequent one
    pub backoff_base: Duration,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            system_proxy: true,
        }
    }
}

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code (`None` = no response)
    Http {
        status: Option<u16>,
        message: String,
        /// Connect failure or timeout; a malformed URL or request is not
        transient: bool,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message, ..
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message, ..
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            transient: e.is_connect() || e.is_timeout(),
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Io(_) => None,
        }
    }
}

impl Retryable for StreamError {
    fn is_retryable(&self) -> bool {
        match self {
            // Gateway/overload responses are transient; any other status is final
            Self::Http {
                status: Some(status),
                ..
            } => matches!(*status, 502..=504),
            // No response: only connect failures and timeouts are worth another try
            Self::Http {
                status: None,
                transient,
                ..
            } => *transient,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::ConnectionReset
            ),
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Build an async HTTP client for one source.
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client, StreamError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(1);
    if !config.system_proxy {
        builder = builder.no_proxy();
    }
    builder.build().map_err(|e| StreamError::from_reqwest(&e))
}

/// Buffer size for gzip stream reader (256KB)
const GZIP_BUF_SIZE: usize = 256 * 1024;

/// Buffered reader over a gzipped HTTP response body with byte counting
pub type GzipReader = BufReader<MultiGzDecoder<CountingReader<TimeoutReader>>>;

/// Shared counter of compressed bytes received, for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// HTTP GET → gunzip → buffered reader with byte counter. Single attempt;
/// see [`crate::retry::retry_with_backoff`] for the retry loop.
///
/// Returns (reader, byte_counter, content_length)
pub fn open_gzip_reader(
    url: &str,
    config: &HttpConfig,
) -> Result<(GzipReader, ByteCounter, Option<u64>), StreamError> {
    let client = http_client(config)?;
    let url = url.to_string();

    let (reader, total_bytes) = SHARED_RUNTIME.handle().block_on(async {
        let response = client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        let total_bytes = response.content_length();

        let stream = response.bytes_stream();
        let async_reader = tokio_util::io::StreamReader::new(
            stream.map(|result| result.map_err(io::Error::other)),
        );

        Ok::<_, StreamError>((
            TimeoutReader::new(Box::pin(async_reader), config.read_timeout),
            total_bytes,
        ))
    })?;

    let counter = Arc::new(AtomicU64::new(0));
    let counting_reader = CountingReader {
        inner: reader,
        count: counter.clone(),
    };
    let gz = MultiGzDecoder::new(counting_reader);
    let buf = BufReader::with_capacity(GZIP_BUF_SIZE, gz);

    Ok((buf, counter, total_bytes))
}

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Async-to-sync bridge with read timeout.
///
/// Each read blocks on the shared runtime; if no data arrives within the
/// configured timeout the read fails with `TimedOut`.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    timeout: Duration,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read timeout ({}s with no data)", timeout.as_secs()),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
            transient: false,
        }
    }

    #[test]
    fn gateway_errors_retryable() {
        assert!(http_err(502).is_retryable());
        assert!(http_err(503).is_retryable());
        assert!(http_err(504).is_retryable());
    }

    #[test]
    fn other_server_errors_fatal() {
        assert!(!http_err(500).is_retryable());
        assert!(!http_err(501).is_retryable());
        assert!(!http_err(505).is_retryable());
    }

    #[test]
    fn client_errors_fatal() {
        assert!(!http_err(400).is_retryable());
        assert!(!http_err(403).is_retryable());
        assert!(!http_err(404).is_retryable());
        assert!(!http_err(429).is_retryable());
    }

    #[test]
    fn transport_error_retryable() {
        let err = StreamError::Http {
            status: None,
            message: "connection refused".to_string(),
            transient: true,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn malformed_request_fatal() {
        let err = StreamError::Http {
            status: None,
            message: "builder error".to_string(),
            transient: false,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_url_fails_on_first_attempt() {
        let config = HttpConfig {
            backoff_base: Duration::from_secs(5),
            ..HttpConfig::default()
        };
        let mut calls = 0;
        let result = crate::retry::retry_with_backoff(
            "bad url",
            config.max_retries,
            config.backoff_base,
            &indicatif::ProgressBar::hidden(),
            || {
                calls += 1;
                open_gzip_reader("not a url", &config)
            },
        );
        let err = result.err().unwrap();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn refused_connection_retryable() {
        // Bind then drop to get a local port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = HttpConfig {
            system_proxy: false,
            ..HttpConfig::default()
        };
        let url = format!("http://127.0.0.1:{port}/feed.gz");
        let err = open_gzip_reader(&url, &config).err().unwrap();
        assert!(err.is_retryable(), "{err}");
    }

    #[test]
    fn io_timeout_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn io_invalid_data_fatal() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::InvalidData, "bad gzip"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_http_with_status() {
        let err = http_err(404);
        assert_eq!(format!("{err}"), "HTTP 404: test");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "timeout".to_string(),
            transient: true,
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn default_config_matches_retry_budget() {
        let config = HttpConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert!(config.system_proxy);
    }

    #[test]
    fn counting_reader_counts_bytes() {
        let counter: ByteCounter = Arc::new(AtomicU64::new(0));
        let mut reader = CountingReader {
            inner: io::Cursor::new(vec![7u8; 1000]),
            count: counter.clone(),
        };
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).unwrap();
        assert_eq!(sink.len(), 1000);
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
    }
}
