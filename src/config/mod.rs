//! Station and show configuration
//!
//! The configuration is a JSON file describing where captures are stored,
//! which stations exist and which shows can be recorded from them. It is
//! loaded once and then handed to the capture pipeline as a read-only value.
//!
//! ```json
//! {
//!   "destination": "/srv/radio",
//!   "default_logo_url": "http://example.org/default.png",
//!   "stations": {
//!     "dlf": {
//!       "name": "Deutschlandfunk",
//!       "stream_url": "http://example.org/dlf.mp3",
//!       "logo_url": "http://example.org/dlf.png"
//!     }
//!   },
//!   "shows": {
//!     "dlf_nachtradio": { "station": "dlf", "name": "Nachtradio", "duration": "55m" }
//!   }
//! }
//! ```

mod duration;

pub use duration::parse_duration;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Date pattern used for publish dates when none is configured
pub const DEFAULT_DATE_PATTERN: &str = "%d.%m.%Y %H:%M";

/// Comment pattern used when none is configured
pub const DEFAULT_COMMENT_PATTERN: &str =
    "{show} from {date}. Copyright {year} {station}, {link_url}";

/// File name of the configuration inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur while loading or querying the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the configuration file
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON or misses required keys
    #[error("Failed to parse configuration file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Configuration text is not valid JSON or misses required keys
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    /// The date pattern contains an unknown strftime specifier
    #[error("Invalid date pattern: {0}")]
    InvalidDatePattern(String),

    /// A show references a station that is not configured
    #[error("Show {show} references unknown station {station}")]
    UnknownStation { show: String, station: String },

    /// A show duration resolves to zero seconds
    #[error("Show {show} has no usable duration: {value:?}")]
    InvalidDuration { show: String, value: String },

    /// The requested show is not configured
    #[error("Unknown show: {0}")]
    UnknownShow(String),
}

/// A radio station that streams shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Key of the station in the configuration
    pub id: String,
    /// Display name, defaults to the id
    pub name: String,
    /// Live stream URL
    pub stream_url: String,
    /// Logo to embed as cover art
    pub logo_url: Option<String>,
    /// Homepage of the station
    pub link_url: Option<String>,
}

/// A show that can be recorded from a station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Show {
    /// Key of the show in the configuration
    pub id: String,
    /// Key of the station airing the show
    pub station_id: String,
    /// Display name
    pub name: String,
    /// Planned recording length
    pub duration: Duration,
    /// Show specific logo, overrides the station logo
    pub logo_url: Option<String>,
    /// Show specific homepage, overrides the station link
    pub link_url: Option<String>,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Root directory for captured episodes
    pub destination: PathBuf,
    /// strftime pattern for publish dates
    pub date_pattern: String,
    /// Pattern for the ID3 comment, see [`crate::PatternFields`]
    pub comment_pattern: String,
    /// Logo used for stations without their own
    pub default_logo_url: Option<String>,
    /// Link used for stations without their own
    pub default_link_url: Option<String>,
    /// Stations by id
    pub stations: BTreeMap<String, Station>,
    /// Shows by id
    pub shows: BTreeMap<String, Show>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    destination: PathBuf,
    #[serde(default)]
    date_pattern: Option<String>,
    #[serde(default)]
    comment_pattern: Option<String>,
    #[serde(default)]
    default_logo_url: Option<String>,
    #[serde(default)]
    default_link_url: Option<String>,
    #[serde(default)]
    stations: BTreeMap<String, StationEntry>,
    #[serde(default)]
    shows: BTreeMap<String, ShowEntry>,
}

#[derive(Debug, Deserialize)]
struct StationEntry {
    #[serde(default)]
    name: Option<String>,
    stream_url: String,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    link_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowEntry {
    station: String,
    name: String,
    duration: DurationEntry,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    link_url: Option<String>,
}

/// Show durations may be given as seconds or as free text like `"1h15m"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationEntry {
    Seconds(u64),
    Text(String),
}

impl DurationEntry {
    fn seconds(&self) -> u64 {
        match self {
            DurationEntry::Seconds(seconds) => *seconds,
            DurationEntry::Text(text) => parse_duration(text),
        }
    }

    fn describe(&self) -> String {
        match self {
            DurationEntry::Seconds(seconds) => seconds.to_string(),
            DurationEntry::Text(text) => text.clone(),
        }
    }
}

impl Configuration {
    /// Returns the platform specific default location of the configuration file
    ///
    /// - Linux: ~/.config/radiotaper/config.json
    /// - macOS: ~/Library/Application Support/org.radiotaper.radiotaper/config.json
    /// - Windows: %APPDATA%\radiotaper\radiotaper\config\config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs = directories::ProjectDirs::from("org", "radiotaper", "radiotaper")
            .ok_or(ConfigError::ConfigDirectoryNotFound)?;

        Ok(proj_dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads and validates the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::resolve(file)
    }

    /// Parses and validates configuration JSON that is already in memory
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(content)?;
        Self::resolve(file)
    }

    /// Applies defaults and checks cross references
    fn resolve(file: ConfigFile) -> Result<Self, ConfigError> {
        let date_pattern = file
            .date_pattern
            .unwrap_or_else(|| DEFAULT_DATE_PATTERN.to_string());
        validate_date_pattern(&date_pattern)?;

        let stations: BTreeMap<String, Station> = file
            .stations
            .into_iter()
            .map(|(id, entry)| {
                let station = Station {
                    name: entry.name.unwrap_or_else(|| id.clone()),
                    stream_url: entry.stream_url,
                    logo_url: entry.logo_url.or_else(|| file.default_logo_url.clone()),
                    link_url: entry.link_url.or_else(|| file.default_link_url.clone()),
                    id: id.clone(),
                };
                (id, station)
            })
            .collect();

        let mut shows = BTreeMap::new();
        for (id, entry) in file.shows {
            if !stations.contains_key(&entry.station) {
                return Err(ConfigError::UnknownStation {
                    show: id,
                    station: entry.station,
                });
            }

            let seconds = entry.duration.seconds();
            if seconds == 0 {
                return Err(ConfigError::InvalidDuration {
                    show: id,
                    value: entry.duration.describe(),
                });
            }

            let show = Show {
                id: id.clone(),
                station_id: entry.station,
                name: entry.name,
                duration: Duration::from_secs(seconds),
                logo_url: entry.logo_url,
                link_url: entry.link_url,
            };
            shows.insert(id, show);
        }

        Ok(Self {
            destination: file.destination,
            date_pattern,
            comment_pattern: file
                .comment_pattern
                .unwrap_or_else(|| DEFAULT_COMMENT_PATTERN.to_string()),
            default_logo_url: file.default_logo_url,
            default_link_url: file.default_link_url,
            stations,
            shows,
        })
    }

    /// Looks up a show by id
    pub fn show(&self, show_id: &str) -> Result<&Show, ConfigError> {
        self.shows
            .get(show_id)
            .ok_or_else(|| ConfigError::UnknownShow(show_id.to_string()))
    }

    /// Returns the station airing `show`
    pub fn station_of(&self, show: &Show) -> Result<&Station, ConfigError> {
        self.stations
            .get(&show.station_id)
            .ok_or_else(|| ConfigError::UnknownStation {
                show: show.id.clone(),
                station: show.station_id.clone(),
            })
    }

    /// Registers a new show for a configured station
    ///
    /// The show id is `<station>_<key>`, matching how shows are usually
    /// named in configuration files. An existing show with the same id is
    /// replaced.
    pub fn add_show(
        &mut self,
        station_id: &str,
        key: &str,
        name: &str,
        duration: Duration,
    ) -> Result<&Show, ConfigError> {
        let id = format!("{}_{}", station_id, key);

        if !self.stations.contains_key(station_id) {
            return Err(ConfigError::UnknownStation {
                show: id,
                station: station_id.to_string(),
            });
        }

        let show = Show {
            id: id.clone(),
            station_id: station_id.to_string(),
            name: name.to_string(),
            duration,
            logo_url: None,
            link_url: None,
        };

        self.shows.insert(id.clone(), show);
        self.show(&id)
    }
}

fn validate_date_pattern(pattern: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidDatePattern(pattern.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "destination": "/srv/radio",
        "default_logo_url": "http://example.org/default.png",
        "default_link_url": "http://my.example.org/",
        "stations": {
            "dlf": {
                "name": "Deutschlandfunk",
                "stream_url": "http://example.org/dlf",
                "logo_url": "http://example.org/dlf.png",
                "link_url": "http://example.org/dlf"
            },
            "dkultur": { "stream_url": "http://example.org/dkultur" }
        },
        "shows": {
            "dlf_nachtradio": {
                "station": "dlf",
                "name": "Nachtradio",
                "duration": "55m",
                "logo_url": "http://example.org/nachtradio.png",
                "link_url": "http://example.org/nachtradio"
            },
            "dkultur_news": { "station": "dkultur", "name": "News", "duration": 300 }
        }
    }"#;

    #[test]
    fn test_load_applies_defaults() {
        let config = Configuration::from_json(SAMPLE).unwrap();

        assert_eq!(config.destination, PathBuf::from("/srv/radio"));
        assert_eq!(config.date_pattern, DEFAULT_DATE_PATTERN);
        assert_eq!(config.comment_pattern, DEFAULT_COMMENT_PATTERN);
        assert_eq!(config.stations.len(), 2);

        let dlf = &config.stations["dlf"];
        assert_eq!(dlf.name, "Deutschlandfunk");
        assert_eq!(dlf.logo_url.as_deref(), Some("http://example.org/dlf.png"));

        let dkultur = &config.stations["dkultur"];
        assert_eq!(dkultur.name, "dkultur");
        assert_eq!(dkultur.logo_url.as_deref(), Some("http://example.org/default.png"));
        assert_eq!(dkultur.link_url.as_deref(), Some("http://my.example.org/"));
    }

    #[test]
    fn test_show_durations() {
        let config = Configuration::from_json(SAMPLE).unwrap();

        let nachtradio = config.show("dlf_nachtradio").unwrap();
        assert_eq!(nachtradio.duration, Duration::from_secs(3300));
        assert_eq!(config.station_of(nachtradio).unwrap().id, "dlf");

        let news = config.show("dkultur_news").unwrap();
        assert_eq!(news.duration, Duration::from_secs(300));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, SAMPLE).unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.shows.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Configuration::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_unknown_show() {
        let config = Configuration::from_json(SAMPLE).unwrap();
        assert!(matches!(
            config.show("nope"),
            Err(ConfigError::UnknownShow(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_show_with_unknown_station_is_rejected() {
        let json = r#"{
            "destination": "/tmp",
            "shows": { "x": { "station": "ghost", "name": "X", "duration": 60 } }
        }"#;
        assert!(matches!(
            Configuration::from_json(json),
            Err(ConfigError::UnknownStation { .. })
        ));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let json = r#"{
            "destination": "/tmp",
            "stations": { "s": { "stream_url": "http://example.org" } },
            "shows": { "s_x": { "station": "s", "name": "X", "duration": "trara" } }
        }"#;
        assert!(matches!(
            Configuration::from_json(json),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_invalid_date_pattern() {
        let json = r#"{ "destination": "/tmp", "date_pattern": "%d.%m.%Y %" }"#;
        assert!(matches!(
            Configuration::from_json(json),
            Err(ConfigError::InvalidDatePattern(_))
        ));
    }

    #[test]
    fn test_add_show_to_station() {
        let mut config = Configuration::from_json(SAMPLE).unwrap();

        let show = config
            .add_show("dlf", "news", "Latest News", Duration::from_secs(10))
            .unwrap();
        assert_eq!(show.id, "dlf_news");
        assert_eq!(show.name, "Latest News");
        assert_eq!(show.logo_url, None);
        assert_eq!(show.station_id, "dlf");

        assert_eq!(config.shows.len(), 3);
        assert_eq!(config.show("dlf_news").unwrap().duration, Duration::from_secs(10));
    }

    #[test]
    fn test_add_show_to_unknown_station() {
        let mut config = Configuration::from_json(SAMPLE).unwrap();
        assert!(
            config
                .add_show("ghost", "news", "News", Duration::from_secs(10))
                .is_err()
        );
    }
}
