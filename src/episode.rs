//! The record of one capture attempt

use crate::config::{ConfigError, Configuration, Show};
use crate::naming::{PatternFields, episode_path, extension_for_stream};
use crate::stream_capture::StopReason;
use chrono::{DateTime, Datelike, Local};
use std::path::PathBuf;
use std::time::Duration;

/// One capture attempt: source, destination, timing and descriptive metadata
///
/// An episode is created from the configuration right before recording,
/// then filled in by the capture (`actual_duration`, `filesize`, `mimetype`)
/// and by the tagging step (`description`).
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// Id of the recorded show
    pub show_id: String,
    /// Id of the station airing the show
    pub station_id: String,
    /// Display name of the show
    pub show_name: String,
    /// Display name of the station
    pub station_name: String,
    /// Episode title
    pub name: String,

    /// Stream to read from
    pub stream_url: String,
    /// Destination of the captured audio, its directory may not exist yet
    pub filename: Option<PathBuf>,

    /// Wall-clock time the capture begins
    pub start_time: DateTime<Local>,
    /// Requested capture length
    pub planned_duration: Duration,
    /// Time elapsed when streaming stopped
    pub actual_duration: Option<Duration>,
    /// Bytes written to `filename`
    pub filesize: Option<u64>,
    /// Content type reported by the stream
    pub mimetype: Option<String>,
    /// Why streaming stopped
    pub stop_reason: Option<StopReason>,

    /// Cover art source
    pub logo_url: Option<String>,
    /// Homepage of the show or station
    pub link_url: Option<String>,
    /// Publish date, formatted with the configured date pattern
    pub pubdate: String,
    /// Human readable description, set while tagging
    pub description: Option<String>,
}

impl Episode {
    /// Prepares an episode of `show` starting at `start_time`
    ///
    /// Show specific logo and link URLs take precedence over the station's.
    pub fn new(
        config: &Configuration,
        show: &Show,
        start_time: DateTime<Local>,
    ) -> Result<Self, ConfigError> {
        let station = config.station_of(show)?;
        let pubdate = start_time.format(&config.date_pattern).to_string();

        let filename = episode_path(
            &config.destination,
            &station.name,
            &show.name,
            &show.id,
            &start_time,
            extension_for_stream(&station.stream_url),
        );

        Ok(Self {
            show_id: show.id.clone(),
            station_id: station.id.clone(),
            show_name: show.name.clone(),
            station_name: station.name.clone(),
            name: format!("{}, {}", show.name, pubdate),
            stream_url: station.stream_url.clone(),
            filename: Some(filename),
            start_time,
            planned_duration: show.duration,
            actual_duration: None,
            filesize: None,
            mimetype: None,
            stop_reason: None,
            logo_url: show.logo_url.clone().or_else(|| station.logo_url.clone()),
            link_url: show.link_url.clone().or_else(|| station.link_url.clone()),
            pubdate,
            description: None,
        })
    }

    /// Year used in copyright notices
    pub fn copyright_year(&self) -> i32 {
        self.start_time.year()
    }

    /// Values for comment and description patterns
    pub fn pattern_fields(&self) -> PatternFields<'_> {
        PatternFields {
            show: &self.show_name,
            date: &self.pubdate,
            year: self.copyright_year(),
            station: &self.station_name,
            link_url: self.link_url.as_deref().unwrap_or_default(),
        }
    }
}
