//! Time-boxed capture of a live stream into a file
//!
//! A capture opens a streaming HTTP GET, writes the body to the episode's
//! destination and stops on whichever comes first:
//!
//! - the source closes the stream,
//! - the planned duration has elapsed,
//! - the shared [`StopSignal`] is raised.
//!
//! None of these is an error. Every wait on the network (for the response
//! head and for each body chunk) is bounded by the deadline and sliced so the
//! stop signal is seen within [`STOP_POLL_INTERVAL`]. Abandoning a wait drops
//! the response, which closes the connection. A stalled source therefore
//! cannot keep the capture running, or blocked, past its deadline; the stop
//! is taken at the deadline, or right after the chunk being written when the
//! deadline passes mid-write.
//!
//! Every failure deletes the partially written file before the error is
//! returned.

use crate::episode::Episode;
use crate::partial_file::PartialFile;
use crate::stop_signal::StopSignal;
use reqwest::header::{CONTENT_TYPE, ToStrError};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::{self, Runtime};
use tracing::{debug, error, warn};

/// Connect timeout and timeout of each individual read from the stream
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the stop signal is checked while waiting for data
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Broad classification of a capture failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// DNS, TCP or TLS failure, timeout or non-2xx response
    Connection,
    /// Malformed data received from the source
    Decode,
    /// Local filesystem failure
    Io,
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureErrorKind::Connection => "connection error",
            CaptureErrorKind::Decode => "decode error",
            CaptureErrorKind::Io => "I/O error",
        };
        f.write_str(name)
    }
}

/// What exactly went wrong during a capture
#[derive(Debug, Error)]
pub enum CaptureCause {
    /// The episode has no destination file name
    #[error("Episode has no destination filename")]
    MissingDestination,

    /// Failed to create the destination directory
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// Failed to open the destination file
    #[error("Failed to open {path} for writing: {source}")]
    CreateFile { path: PathBuf, source: io::Error },

    /// Failed to send the request or to receive the response head
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server answered with HTTP {0}")]
    Status(StatusCode),

    /// The Content-Type header is not valid text
    #[error("Content-Type header is not valid text: {0}")]
    InvalidHeader(#[source] ToStrError),

    /// Reading from the stream failed
    #[error("Failed to read stream: {0}")]
    Read(#[source] reqwest::Error),

    /// Writing to the destination file failed
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// The size of the written file could not be determined
    #[error("Failed to inspect {path}: {source}")]
    Metadata { path: PathBuf, source: io::Error },
}

impl CaptureCause {
    /// Classifies the failure
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            CaptureCause::MissingDestination
            | CaptureCause::CreateDirectory { .. }
            | CaptureCause::CreateFile { .. }
            | CaptureCause::Write { .. }
            | CaptureCause::Metadata { .. } => CaptureErrorKind::Io,
            CaptureCause::Request(e) | CaptureCause::Read(e) => classify_http_error(e),
            CaptureCause::Status(_) => CaptureErrorKind::Connection,
            CaptureCause::InvalidHeader(_) => CaptureErrorKind::Decode,
        }
    }

    /// HTTP status involved in the failure, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CaptureCause::Status(status) => Some(*status),
            CaptureCause::Request(e) | CaptureCause::Read(e) => e.status(),
            _ => None,
        }
    }
}

fn classify_http_error(error: &reqwest::Error) -> CaptureErrorKind {
    if error.is_decode() && !error.is_timeout() {
        CaptureErrorKind::Decode
    } else {
        CaptureErrorKind::Connection
    }
}

/// A failed capture
///
/// The partially written destination file has already been removed when
/// this error is returned.
#[derive(Debug, Error)]
#[error("Could not capture {url} ({}): {cause}", .cause.kind())]
pub struct CaptureError {
    /// The stream that was captured
    pub url: String,
    /// Destination of the capture, if the episode had one
    pub path: Option<PathBuf>,
    /// The underlying failure
    #[source]
    pub cause: CaptureCause,
}

impl CaptureError {
    /// Classifies the failure
    pub fn kind(&self) -> CaptureErrorKind {
        self.cause.kind()
    }

    /// HTTP status involved in the failure, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.cause.status()
    }
}

/// Errors while setting up a [`StreamCapturer`]
#[derive(Debug, Error)]
pub enum CapturerSetupError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The async runtime driving the client could not be started
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Why a successful capture stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source closed the stream
    EndOfStream,
    /// The planned duration elapsed
    DeadlineReached,
    /// The stop signal was raised
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EndOfStream => "stream ended",
            StopReason::DeadlineReached => "planned duration reached",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Tunables of a [`StreamCapturer`]
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Connect timeout and timeout of each individual read
    pub http_timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Result of waiting on the network under deadline and stop signal
enum Wait<T> {
    Ready(T),
    Stopped(StopReason),
}

/// Records live streams into files
pub struct StreamCapturer {
    runtime: Runtime,
    client: Client,
    stop: StopSignal,
}

impl StreamCapturer {
    /// Creates a capturer whose captures end early once `stop` is raised
    pub fn new(options: CaptureOptions, stop: StopSignal) -> Result<Self, CapturerSetupError> {
        // One worker is enough: it only drives the connection of the running
        // capture, and closes it as soon as the response is dropped.
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("stream-capture")
            .enable_all()
            .build()?;

        // No overall timeout: a capture legitimately runs for hours
        let client = {
            let _context = runtime.enter();
            Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(options.http_timeout)
                .read_timeout(options.http_timeout)
                .pool_max_idle_per_host(0)
                .build()?
        };

        Ok(Self {
            runtime,
            client,
            stop,
        })
    }

    /// Captures the episode's stream into its destination file
    ///
    /// On success the episode comes back with `actual_duration`, `filesize`,
    /// `mimetype` and `stop_reason` filled in. On failure the destination file
    /// is deleted and the episode is consumed.
    ///
    /// Returns within [`STOP_POLL_INTERVAL`] of the deadline or of the stop
    /// signal being raised, even when the source has stalled.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use radiotaper::{CaptureOptions, Configuration, Episode, StopSignal, StreamCapturer};
    /// use std::path::Path;
    ///
    /// let config = Configuration::load(Path::new("config.json")).unwrap();
    /// let show = config.show("dlf_nachtradio").unwrap();
    /// let episode = Episode::new(&config, show, chrono::Local::now()).unwrap();
    ///
    /// let capturer = StreamCapturer::new(CaptureOptions::default(), StopSignal::new()).unwrap();
    /// let episode = capturer.capture(episode).unwrap();
    /// println!("captured {:?} bytes", episode.filesize);
    /// ```
    pub fn capture(&self, mut episode: Episode) -> Result<Episode, CaptureError> {
        let url = episode.stream_url.clone();

        let Some(path) = episode.filename.clone() else {
            let err = CaptureError {
                url,
                path: None,
                cause: CaptureCause::MissingDestination,
            };
            error!(url = %err.url, error = %err.cause, "could not capture stream");
            return Err(err);
        };

        debug!(
            url = %url,
            path = %path.display(),
            planned = ?episode.planned_duration,
            "write stream to file"
        );

        let guard = PartialFile::new(&path);
        let result = self
            .runtime
            .block_on(self.write_stream(&url, guard.path(), episode.planned_duration))
            .and_then(|outcome| {
                let filesize = fs::metadata(guard.path())
                    .map_err(|e| CaptureCause::Metadata {
                        path: path.clone(),
                        source: e,
                    })?
                    .len();
                Ok((outcome, filesize))
            });

        match result {
            Ok((outcome, filesize)) => {
                guard.commit();

                debug!(
                    path = %path.display(),
                    elapsed = ?outcome.elapsed,
                    filesize,
                    reason = %outcome.stop,
                    "capture finished"
                );

                episode.actual_duration = Some(outcome.elapsed);
                episode.filesize = Some(filesize);
                episode.mimetype = outcome.mimetype;
                episode.stop_reason = Some(outcome.stop);
                Ok(episode)
            }
            Err(cause) => {
                // Remove the partial file before reporting
                drop(guard);

                let err = CaptureError {
                    url,
                    path: Some(path),
                    cause,
                };
                error!(
                    url = %err.url,
                    path = %path_display(&err.path),
                    kind = %err.kind(),
                    status = ?err.status(),
                    error = %err.cause,
                    "could not capture stream"
                );
                Err(err)
            }
        }
    }

    /// Streams `url` into `path` until the source ends, the deadline passes
    /// or the stop signal is raised
    async fn write_stream(
        &self,
        url: &str,
        path: &Path,
        planned: Duration,
    ) -> Result<StreamOutcome, CaptureCause> {
        let start = Instant::now();
        let deadline = start + planned;

        // Create the directory if it doesn't exist
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "create destination directory");
                fs::create_dir_all(dir).map_err(|e| CaptureCause::CreateDirectory {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut file = File::create(path).map_err(|e| CaptureCause::CreateFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let (stop, mimetype) = self.pump(url, &mut file, path, deadline).await?;
        let elapsed = start.elapsed();

        if stop == StopReason::Interrupted {
            warn!(path = %path.display(), "Capturing interrupted");
        }

        file.flush().map_err(|e| CaptureCause::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(StreamOutcome {
            stop,
            elapsed,
            mimetype,
        })
    }

    /// Opens the stream and moves its chunks into the file
    ///
    /// The response is dropped on return, which releases the connection.
    async fn pump(
        &self,
        url: &str,
        file: &mut File,
        path: &Path,
        deadline: Instant,
    ) -> Result<(StopReason, Option<String>), CaptureCause> {
        let mut response = match self.wait(self.client.get(url).send(), deadline).await {
            Wait::Ready(response) => response.map_err(CaptureCause::Request)?,
            Wait::Stopped(stop) => return Ok((stop, None)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureCause::Status(status));
        }

        let mut mimetype = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.to_str().map(str::to_string))
            .transpose()
            .map_err(CaptureCause::InvalidHeader)?;
        debug!(url, status = %status, mimetype = ?mimetype, "stream opened");

        // Sniff the format from the first chunk when the server did not say
        let mut sniff = mimetype
            .as_deref()
            .is_none_or(|value| value.starts_with("application/octet-stream"));

        loop {
            let chunk = match self.wait(response.chunk(), deadline).await {
                Wait::Ready(chunk) => chunk.map_err(CaptureCause::Read)?,
                Wait::Stopped(stop) => return Ok((stop, mimetype)),
            };
            let Some(chunk) = chunk else {
                return Ok((StopReason::EndOfStream, mimetype));
            };

            if sniff {
                sniff = false;
                if let Some(kind) = infer::get(&chunk) {
                    mimetype = Some(kind.mime_type().to_string());
                }
            }

            file.write_all(&chunk).map_err(|e| CaptureCause::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }

    /// Waits for `future` until the deadline passes or the stop signal is
    /// raised, whichever comes first
    ///
    /// Abandoning the wait drops `future`.
    async fn wait<F: Future>(&self, future: F, deadline: Instant) -> Wait<F::Output> {
        let mut future = pin!(future);

        loop {
            if self.stop.is_raised() {
                return Wait::Stopped(StopReason::Interrupted);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Wait::Stopped(StopReason::DeadlineReached);
            }

            if let Ok(output) =
                tokio::time::timeout(remaining.min(STOP_POLL_INTERVAL), future.as_mut()).await
            {
                return Wait::Ready(output);
            }
        }
    }
}

/// Facts about a finished stream, before they are stored on the episode
struct StreamOutcome {
    stop: StopReason,
    elapsed: Duration,
    mimetype: Option<String>,
}

fn path_display(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
