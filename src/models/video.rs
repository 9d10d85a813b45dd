// External video URL parsing. Milestones may point at a hosted video; the
// public tree exposes the platform and its native video id so clients can
// build an embed without re-parsing URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPlatform {
    Youtube,
    Vimeo,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEmbed {
    pub platform: VideoPlatform,
    pub video_id: Option<String>,
    pub url: String,
}

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{6,20})",
    )
    .unwrap()
});

static VIMEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"vimeo\.com/(?:video/)?(\d+)").unwrap());

/// Classify a video URL and pull out the platform-native id where one exists.
/// Unknown hosts pass through unparsed.
pub fn parse_video_url(url: &str) -> VideoEmbed {
    let trimmed = url.trim();
    if let Some(caps) = YOUTUBE_ID.captures(trimmed) {
        return VideoEmbed {
            platform: VideoPlatform::Youtube,
            video_id: caps.get(1).map(|m| m.as_str().to_string()),
            url: trimmed.to_string(),
        };
    }
    if let Some(caps) = VIMEO_ID.captures(trimmed) {
        return VideoEmbed {
            platform: VideoPlatform::Vimeo,
            video_id: caps.get(1).map(|m| m.as_str().to_string()),
            url: trimmed.to_string(),
        };
    }
    VideoEmbed {
        platform: VideoPlatform::Other,
        video_id: None,
        url: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_youtube_watch_urls() {
        let embed = parse_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(embed.platform, VideoPlatform::Youtube);
        assert_eq!(embed.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn parses_short_and_embed_forms() {
        let short = parse_video_url("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(short.video_id.as_deref(), Some("dQw4w9WgXcQ"));

        let embed = parse_video_url("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0");
        assert_eq!(embed.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn parses_vimeo_urls() {
        let embed = parse_video_url("https://vimeo.com/123456789");
        assert_eq!(embed.platform, VideoPlatform::Vimeo);
        assert_eq!(embed.video_id.as_deref(), Some("123456789"));
    }

    #[test]
    fn unknown_hosts_pass_through() {
        let embed = parse_video_url("https://example.com/clip.mp4");
        assert_eq!(embed.platform, VideoPlatform::Other);
        assert_eq!(embed.video_id, None);
        assert_eq!(embed.url, "https://example.com/clip.mp4");
    }
}
