//! Station logo download for embedded cover art

use id3::frame::{Picture, PictureType};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Image types that are embedded, everything else is skipped
const ACCEPTED_LOGO_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Description stored with the embedded picture
pub(crate) const LOGO_DESCRIPTION: &str = "Station logo";

/// Errors while fetching a logo
///
/// These never abort tagging; they are logged and the file is tagged
/// without cover art.
#[derive(Debug, Error)]
pub enum LogoError {
    /// The request could not be sent or the body not be read
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },
}

/// Downloads logos and turns them into ID3 pictures
pub(crate) struct LogoFetcher {
    client: Client,
}

impl LogoFetcher {
    pub(crate) fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetches the logo at `url` as a front cover picture
    ///
    /// A HEAD request decides whether the logo is usable at all; only JPEG,
    /// PNG and GIF images are downloaded. Returns `Ok(None)` for any other
    /// content type.
    pub(crate) fn fetch(&self, url: &str) -> Result<Option<Picture>, LogoError> {
        let head = self
            .client
            .head(url)
            .send()
            .map_err(|e| LogoError::Request {
                url: url.to_string(),
                source: e,
            })?;
        ensure_success(url, head.status())?;

        let Some(mime_type) = head
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type)
        else {
            debug!(url, "logo has no content type, skipping");
            return Ok(None);
        };

        if !ACCEPTED_LOGO_TYPES.contains(&mime_type.as_str()) {
            debug!(url, mime_type = %mime_type, "logo is not a supported image, skipping");
            return Ok(None);
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| LogoError::Request {
                url: url.to_string(),
                source: e,
            })?;
        ensure_success(url, response.status())?;

        let data = response.bytes().map_err(|e| LogoError::Request {
            url: url.to_string(),
            source: e,
        })?;
        debug!(url, mime_type = %mime_type, size = data.len(), "logo downloaded");

        Ok(Some(Picture {
            mime_type,
            picture_type: PictureType::CoverFront,
            description: LOGO_DESCRIPTION.to_string(),
            data: data.to_vec(),
        }))
    }
}

fn ensure_success(url: &str, status: StatusCode) -> Result<(), LogoError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(LogoError::Status {
            url: url.to_string(),
            status,
        })
    }
}

/// Strips parameters from a content type and normalises its case
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}
