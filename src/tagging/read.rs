//! Read the tags written by the tagger back from a file

use id3::frame::Content;
use id3::{Tag, TagLike};
use std::path::Path;

use super::TagError;

/// Tag values of a captured episode as stored in the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeTags {
    pub title: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    pub album: Option<String>,
    pub length_ms: Option<u32>,
    pub performer: Option<String>,
    pub copyright: Option<String>,
    pub comment: Option<String>,
    pub composer: Option<String>,
    /// Mime type of the embedded front cover, if any
    pub cover_mime_type: Option<String>,
    /// Description of the embedded front cover, if any
    pub cover_description: Option<String>,
}

/// Reads the ID3v2 tag block of `path`
pub fn read_tags(path: &Path) -> Result<EpisodeTags, TagError> {
    let tag = Tag::read_from_path(path).map_err(|e| TagError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let cover = tag.pictures().next();

    Ok(EpisodeTags {
        title: text_frame(&tag, "TIT2"),
        date: text_frame(&tag, "TDRC"),
        genre: text_frame(&tag, "TCON"),
        album: text_frame(&tag, "TALB"),
        length_ms: text_frame(&tag, "TLEN").and_then(|s| s.trim().parse::<u32>().ok()),
        performer: text_frame(&tag, "TPE1"),
        copyright: text_frame(&tag, "TCOP"),
        comment: tag.comments().next().map(|c| c.text.clone()),
        composer: text_frame(&tag, "TCOM"),
        cover_mime_type: cover.map(|p| p.mime_type.clone()),
        cover_description: cover.map(|p| p.description.clone()),
    })
}

fn text_frame(tag: &Tag, id: &str) -> Option<String> {
    match tag.get(id)?.content() {
        Content::Text(s) => Some(s.clone()),
        _ => None,
    }
}
