//! Naming helpers for captured episodes
//!
//! Destination paths are derived from station and show names, which come from
//! user configuration and may contain characters that are not valid in file
//! names. Free text for tags (comment, description) is rendered from patterns
//! with named placeholders.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Audio file extensions recognised in stream URLs
const KNOWN_AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "aac", "m4a", "opus", "flac"];

/// Extension used when the stream URL gives no usable hint
const DEFAULT_EXTENSION: &str = "mp3";

/// Values available to text patterns
///
/// Supported placeholders:
/// - `{show}` - Show name
/// - `{date}` - Publish date, already formatted
/// - `{year}` - Copyright year
/// - `{station}` - Station name
/// - `{link_url}` - Station or show homepage
#[derive(Debug, Clone, Copy)]
pub struct PatternFields<'a> {
    pub show: &'a str,
    pub date: &'a str,
    pub year: i32,
    pub station: &'a str,
    pub link_url: &'a str,
}

/// Sanitizes a string for use in filenames by replacing problematic characters
///
/// Replaces characters that are invalid or problematic in filenames across platforms:
/// - Path separators: / \
/// - Reserved characters: : * ? " < > |
/// - Control characters
/// - Trim leading/trailing whitespace and dots
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    sanitized
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

/// Renders a pattern by substituting the placeholders listed on [`PatternFields`]
///
/// Unknown placeholders are left untouched.
///
/// # Examples
///
/// ```
/// use radiotaper::{PatternFields, render_pattern};
///
/// let fields = PatternFields {
///     show: "Nachtradio",
///     date: "18.10.2026 23:05",
///     year: 2026,
///     station: "Deutschlandfunk",
///     link_url: "https://example.org/dlf",
/// };
/// assert_eq!(
///     render_pattern("{show} ({year}), {station}", &fields),
///     "Nachtradio (2026), Deutschlandfunk"
/// );
/// ```
pub fn render_pattern(pattern: &str, fields: &PatternFields<'_>) -> String {
    pattern
        .replace("{show}", fields.show)
        .replace("{date}", fields.date)
        .replace("{year}", &fields.year.to_string())
        .replace("{station}", fields.station)
        .replace("{link_url}", fields.link_url)
}

/// Picks a file extension for a capture from its stream URL
///
/// Query strings and fragments are ignored. Falls back to `mp3` when the last
/// path segment carries no known audio extension.
pub fn extension_for_stream(stream_url: &str) -> &'static str {
    let path = stream_url
        .split(['?', '#'])
        .next()
        .unwrap_or(stream_url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);

    last_segment
        .rsplit_once('.')
        .and_then(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            KNOWN_AUDIO_EXTENSIONS
                .iter()
                .find(|known| **known == ext)
                .copied()
        })
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Builds the destination path of an episode
///
/// Layout: `<destination>/<station>/<show>/<show_id>_<YYYY-MM-DD_HH-MM>.<ext>`
pub fn episode_path<Tz>(
    destination: &Path,
    station_name: &str,
    show_name: &str,
    show_id: &str,
    start_time: &DateTime<Tz>,
    extension: &str,
) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = start_time.format("%Y-%m-%d_%H-%M");
    let file_name = format!("{}_{}.{}", sanitize_filename(show_id), stamp, extension);

    destination
        .join(sanitize_filename(station_name))
        .join(sanitize_filename(show_name))
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fields() -> PatternFields<'static> {
        PatternFields {
            show: "Nachtradio",
            date: "18.10.2026 23:05",
            year: 2026,
            station: "Deutschlandfunk",
            link_url: "http://example.org/dlf",
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Normal Name"), "Normal Name");
        assert_eq!(sanitize_filename("Jazz/Blues: Live"), "Jazz-Blues- Live");
        assert_eq!(sanitize_filename("What?"), "What-");
        assert_eq!(sanitize_filename("  ..Hidden.. "), "Hidden");
        assert_eq!(sanitize_filename("Tab\there"), "Tab-here");
    }

    #[test]
    fn test_render_all_placeholders() {
        let rendered = render_pattern(
            "{show} | {date} | {year} | {station} | {link_url}",
            &fields(),
        );
        assert_eq!(
            rendered,
            "Nachtradio | 18.10.2026 23:05 | 2026 | Deutschlandfunk | http://example.org/dlf"
        );
    }

    #[test]
    fn test_render_repeated_and_unknown_placeholders() {
        let rendered = render_pattern("{show} {show} {unknown}", &fields());
        assert_eq!(rendered, "Nachtradio Nachtradio {unknown}");
    }

    #[test]
    fn test_extension_for_stream() {
        assert_eq!(extension_for_stream("http://example.org/live.ogg"), "ogg");
        assert_eq!(extension_for_stream("http://example.org/live.MP3?token=1"), "mp3");
        assert_eq!(extension_for_stream("http://example.org/stream"), "mp3");
        assert_eq!(extension_for_stream("http://example.org/a.b/stream.m3u"), "mp3");
        assert_eq!(extension_for_stream("http://example.org/x.aac#frag"), "aac");
    }

    #[test]
    fn test_episode_path_layout() {
        let start = Utc.with_ymd_and_hms(2026, 10, 18, 23, 5, 0).unwrap();
        let path = episode_path(
            Path::new("/srv/radio"),
            "Deutschlandfunk",
            "Jazz/Live",
            "dlf_jazz",
            &start,
            "mp3",
        );

        assert_eq!(
            path,
            PathBuf::from("/srv/radio/Deutschlandfunk/Jazz-Live/dlf_jazz_2026-10-18_23-05.mp3")
        );
    }
}
