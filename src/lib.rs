//! radiotaper - Record live radio shows as tagged podcast episodes
//!
//! This library captures a live audio stream into a local file for a bounded
//! duration and then embeds podcast metadata (title, date, station, cover
//! art) into the file as an ID3v2 tag block.

mod config;
mod episode;
mod naming;
mod partial_file;
mod stop_signal;
mod stream_capture;
mod tagging;

pub use config::{
    ConfigError, Configuration, DEFAULT_COMMENT_PATTERN, DEFAULT_DATE_PATTERN, Show, Station,
    parse_duration,
};
pub use episode::Episode;
pub use naming::{PatternFields, episode_path, extension_for_stream, render_pattern, sanitize_filename};
pub use stop_signal::StopSignal;
pub use stream_capture::{
    CaptureCause, CaptureError, CaptureErrorKind, CaptureOptions, CapturerSetupError,
    DEFAULT_HTTP_TIMEOUT, STOP_POLL_INTERVAL, StopReason, StreamCapturer,
};
pub use tagging::{
    DEFAULT_LOGO_TIMEOUT, EpisodeTags, GENRE, LogoError, MetadataTagger, TagError, read_tags,
};

use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Progress event emitted while recording a show
///
/// These events allow library users to track progress and provide feedback
/// while a (potentially long) capture is running.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Recording of a show started
    Started { show_id: String, show_name: String },

    /// Streaming into the destination file
    Capturing {
        stream_url: String,
        path: PathBuf,
        planned_duration: Duration,
    },

    /// Streaming stopped
    Captured {
        actual_duration: Duration,
        filesize: u64,
        reason: StopReason,
    },

    /// Writing metadata into the file
    Tagging { path: PathBuf },

    /// Recording complete
    Complete { path: PathBuf },
}

/// Top-level error type for radiotaper operations
#[derive(Debug, Error)]
pub enum RadiotaperError {
    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The stream capturer could not be set up
    #[error("Capture setup error: {0}")]
    CaptureSetup(#[from] CapturerSetupError),

    /// The HTTP client for logos could not be set up
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Error while capturing the stream
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Error while tagging the captured file
    #[error("Tagging error: {0}")]
    Tag(#[from] TagError),
}

/// Settings of a [`Recorder`]
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Stream capture tunables
    pub capture: CaptureOptions,
    /// Timeout for logo requests
    pub logo_timeout: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            capture: CaptureOptions::default(),
            logo_timeout: DEFAULT_LOGO_TIMEOUT,
        }
    }
}

/// Captures shows and tags the results
///
/// Each recording runs sequentially: the capture finishes (or fails) before
/// tagging starts. A raised [`StopSignal`] ends the running capture early;
/// the shortened episode is still tagged.
pub struct Recorder {
    capturer: StreamCapturer,
    tagger: MetadataTagger,
}

impl Recorder {
    /// Creates a recorder whose captures stop early once `stop` is raised
    pub fn new(options: RecorderOptions, stop: StopSignal) -> Result<Self, RadiotaperError> {
        Ok(Self {
            capturer: StreamCapturer::new(options.capture, stop)?,
            tagger: MetadataTagger::new(options.logo_timeout)?,
        })
    }

    /// Records one episode of the show `show_id`
    ///
    /// Progress events are emitted through the provided callback, allowing
    /// library users to display status or remain silent.
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded station and show configuration
    /// * `show_id` - Id of the show to record
    /// * `progress_callback` - Closure called with progress events
    ///
    /// # Returns
    ///
    /// The finished `Episode`. When tagging fails the error is returned but
    /// the captured audio stays on disk untagged.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use radiotaper::{Configuration, Recorder, RecorderOptions, StopSignal};
    /// use std::path::Path;
    ///
    /// let config = Configuration::load(Path::new("config.json")).unwrap();
    /// let recorder = Recorder::new(RecorderOptions::default(), StopSignal::new()).unwrap();
    ///
    /// let episode = recorder.record(&config, "dlf_nachtradio", |_| {}).unwrap();
    /// println!("Recorded {:?}", episode.filename);
    /// ```
    pub fn record<F>(
        &self,
        config: &Configuration,
        show_id: &str,
        mut progress_callback: F,
    ) -> Result<Episode, RadiotaperError>
    where
        F: FnMut(ProgressEvent),
    {
        debug!(show_id, "capture show");

        let show = config.show(show_id)?;
        progress_callback(ProgressEvent::Started {
            show_id: show.id.clone(),
            show_name: show.name.clone(),
        });

        let episode = Episode::new(config, show, Local::now())?;
        if let Some(path) = &episode.filename {
            progress_callback(ProgressEvent::Capturing {
                stream_url: episode.stream_url.clone(),
                path: path.clone(),
                planned_duration: episode.planned_duration,
            });
        }

        let mut episode = self.capturer.capture(episode)?;
        if let (Some(actual_duration), Some(filesize), Some(reason)) =
            (episode.actual_duration, episode.filesize, episode.stop_reason)
        {
            progress_callback(ProgressEvent::Captured {
                actual_duration,
                filesize,
                reason,
            });
        }

        if let Some(path) = &episode.filename {
            progress_callback(ProgressEvent::Tagging { path: path.clone() });
        }

        if let Err(e) = self.tagger.tag(&mut episode, &config.comment_pattern) {
            error!(show_id, error = %e, "Could not complete capturing");
            return Err(e.into());
        }

        if let Some(path) = &episode.filename {
            progress_callback(ProgressEvent::Complete { path: path.clone() });
        }

        Ok(episode)
    }
}

/// Records one episode of `show_id` with default options
///
/// Convenience wrapper around [`Recorder::record`].
pub fn record_show<F>(
    config: &Configuration,
    show_id: &str,
    stop: &StopSignal,
    progress_callback: F,
) -> Result<Episode, RadiotaperError>
where
    F: FnMut(ProgressEvent),
{
    Recorder::new(RecorderOptions::default(), stop.clone())?.record(config, show_id, progress_callback)
}
