//! ID3 tagging of captured episodes
//!
//! After a capture the file gets an ID3v2.4 tag block describing the episode
//! as a podcast: title, date, show, station, length, a free-text comment and,
//! when the station logo can be fetched, a front cover picture.
//!
//! Cover art is optional. Any problem fetching the logo is logged and the
//! file is tagged without it.

mod logo;
mod read;

pub use logo::LogoError;
pub use read::{EpisodeTags, read_tags};

use crate::episode::Episode;
use crate::naming::render_pattern;
use id3::frame::Comment;
use id3::{Tag, TagLike, Version};
use logo::LogoFetcher;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Genre written for every episode
pub const GENRE: &str = "Podcast";

/// Template of the human readable episode description
const DESCRIPTION_PATTERN: &str =
    "Show: {show}<br>Date: {date}<br>Copyright: {year} <a href=\"{link_url}\">{station}</a>";

/// Language of the comment frame
const COMMENT_LANGUAGE: &str = "eng";

/// Content descriptor of the comment frame
const COMMENT_DESCRIPTION: &str = "desc";

/// Timeout for logo requests
pub const DEFAULT_LOGO_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while tagging a captured file
#[derive(Debug, Error)]
pub enum TagError {
    /// The episode has no file to tag
    #[error("Filename is not set, cannot add metadata")]
    MissingFilename,

    /// The captured file does not exist
    #[error("Captured file {0} does not exist")]
    FileNotFound(PathBuf),

    /// The captured file has no content
    #[error("Captured file {0} is empty")]
    EmptyFile(PathBuf),

    /// The captured file could not be inspected
    #[error("Failed to inspect {path}: {source}")]
    Inspect { path: PathBuf, source: io::Error },

    /// The tag block could not be written
    #[error("Failed to write tags to {path}: {source}")]
    WriteFailed { path: PathBuf, source: id3::Error },

    /// The tag block could not be read
    #[error("Failed to read tags from {path}: {source}")]
    ReadFailed { path: PathBuf, source: id3::Error },
}

/// Writes episode metadata into captured files
pub struct MetadataTagger {
    logos: LogoFetcher,
}

impl MetadataTagger {
    /// Creates a tagger whose logo requests give up after `logo_timeout`
    pub fn new(logo_timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            logos: LogoFetcher::new(logo_timeout)?,
        })
    }

    /// Tags the captured file of `episode`
    ///
    /// Sets `episode.description` and writes the ID3 block in place,
    /// replacing an existing ID3v2 block. The comment is rendered from
    /// `comment_pattern`, see [`crate::PatternFields`] for the placeholders.
    ///
    /// Fails without touching the file when the episode has no filename or
    /// the file is missing or empty.
    pub fn tag(&self, episode: &mut Episode, comment_pattern: &str) -> Result<(), TagError> {
        let path = episode.filename.clone().ok_or(TagError::MissingFilename)?;

        match fs::metadata(&path) {
            Ok(metadata) if metadata.len() == 0 => return Err(TagError::EmptyFile(path)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TagError::FileNotFound(path));
            }
            Err(e) => return Err(TagError::Inspect { path, source: e }),
        }

        debug!(path = %path.display(), "add metadata");

        let fields = episode.pattern_fields();
        let description = render_pattern(DESCRIPTION_PATTERN, &fields);
        let comment = render_pattern(comment_pattern, &fields);

        // See https://id3.org/id3v2.4.0-frames for the frame ids
        let mut tag = Tag::new();
        tag.set_title(episode.name.as_str());
        tag.set_text("TDRC", episode.pubdate.as_str());
        tag.set_genre(GENRE);
        tag.set_album(episode.show_name.as_str());
        if let Some(actual) = episode.actual_duration {
            tag.set_duration(u32::try_from(actual.as_millis()).unwrap_or(u32::MAX));
        }
        tag.set_artist(episode.station_name.as_str());
        tag.set_text("TCOP", episode.station_name.as_str());
        tag.add_frame(Comment {
            lang: COMMENT_LANGUAGE.to_string(),
            description: COMMENT_DESCRIPTION.to_string(),
            text: comment,
        });
        if let Some(link_url) = &episode.link_url {
            tag.set_text("TCOM", link_url.as_str());
        }

        self.add_logo(episode, &mut tag);

        tag.write_to_path(&path, Version::Id3v24)
            .map_err(|e| TagError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;

        episode.description = Some(description);
        Ok(())
    }

    /// Embeds the episode's logo as front cover, if there is a usable one
    fn add_logo(&self, episode: &Episode, tag: &mut Tag) {
        let Some(url) = episode.logo_url.as_deref() else {
            return;
        };

        match self.logos.fetch(url) {
            Ok(Some(picture)) => {
                tag.add_frame(picture);
            }
            Ok(None) => {}
            Err(e) => {
                error!(url, error = %e, "Error during embedding logo");
            }
        }
    }
}
