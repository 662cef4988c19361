//! Pure extraction functions over page and script text
//!
//! Every extractor takes text and returns an optional URL; none of them
//! perform I/O. [`find_stream_url`] runs them in order and stops at the
//! first hit.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use url::Url;

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).expect("valid regex"));
    };
}

lazy_regex!(M3U8_URL, r#"(?i)https?://[^'"\s<>]+\.m3u8[^'"\s<>]*"#);
lazy_regex!(MP4_URL, r#"(?i)https?://[^'"\s<>]+\.mp4[^'"\s<>]*"#);
lazy_regex!(
    VIDEO_TAG_SRC,
    r#"(?is)<(?:video|source)\b[^>]*?\b(?:data-)?src\s*=\s*["'](https?://[^"']+)["']"#
);
lazy_regex!(
    FILE_FIELD,
    r#"(?i)\bfile\s*[:=]\s*["'](https?://[^"'\s]+)["']"#
);
lazy_regex!(
    SOURCE_LIST_FILE,
    r#"(?i)\bsources?\s*[:=]\s*\[\s*\{\s*["']?file["']?\s*[:=]\s*["'](https?://[^"'\s]+)["']"#
);
lazy_regex!(ATOB_PAYLOAD, r#"(?i)atob\(\s*['"]([^'"]+)['"]\s*\)"#);
lazy_regex!(
    API_CALL,
    r#"(?i)https?://[^'"\s]+/video\.php\?id=([A-Za-z0-9_-]+)"#
);
lazy_regex!(
    OG_IMAGE,
    r#"(?i)property=["']og:image["']\s*content=["']([^"']+)["']"#
);
lazy_regex!(POSTER_ATTR, r#"(?i)\bposter=["']([^"']+)["']"#);
lazy_regex!(
    IFRAME_SRC,
    r#"(?is)<iframe\b[^>]*?\b(?:data-src|src)\s*=\s*["']([^"']+)["']"#
);
lazy_regex!(
    DATA_PLAYER_ATTR,
    r#"(?i)\bdata-(?:url|embed|player|link)\s*=\s*["']([^"']+)["']"#
);
lazy_regex!(OPTION_VALUE, r#"(?is)<option\b[^>]*?\bvalue\s*=\s*["']([^"']+)["']"#);

/// An extractor over text
pub type Extractor = fn(&str) -> Option<String>;

/// Extractors in the order they are tried
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("video-element", find_video_tag_src),
    ("literal", find_literal_media_url),
    ("source-list", find_source_list_file),
    ("file-field", find_file_field),
    ("encoded", find_encoded_media_url),
];

/// Undo the JSON/JS escaping of slashes that hides URLs from plain matching
fn unescape_slashes(text: &str) -> Cow<'_, str> {
    if text.contains("\\/") || text.contains("\\u002") {
        Cow::Owned(
            text.replace("\\/", "/")
                .replace("\\u002F", "/")
                .replace("\\u002f", "/"),
        )
    } else {
        Cow::Borrowed(text)
    }
}

/// First `.m3u8` URL, else first `.mp4` URL
pub fn find_literal_media_url(text: &str) -> Option<String> {
    let text = unescape_slashes(text);
    M3U8_URL
        .find(&text)
        .or_else(|| MP4_URL.find(&text))
        .map(|m| m.as_str().to_string())
}

/// Absolute `src` of a `<video>` or `<source>` tag
pub fn find_video_tag_src(text: &str) -> Option<String> {
    VIDEO_TAG_SRC.captures(text).map(|c| c[1].to_string())
}

/// `file: "https://..."` player config field
pub fn find_file_field(text: &str) -> Option<String> {
    let text = unescape_slashes(text);
    FILE_FIELD.captures(&text).map(|c| c[1].to_string())
}

/// `sources: [{ file: "https://..." }]` player config
pub fn find_source_list_file(text: &str) -> Option<String> {
    let text = unescape_slashes(text);
    SOURCE_LIST_FILE.captures(&text).map(|c| c[1].to_string())
}

/// Media URL inside an `atob("...")` payload
pub fn find_encoded_media_url(text: &str) -> Option<String> {
    ATOB_PAYLOAD.captures_iter(text).find_map(|caps| {
        let decoded = STANDARD.decode(caps[1].trim()).ok()?;
        find_literal_media_url(&String::from_utf8_lossy(&decoded))
    })
}

/// Run [`EXTRACTORS`] in order
pub fn find_stream_url(text: &str) -> Option<String> {
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let hit = extract(text)?;
        tracing::debug!("Stream URL found by {} extractor", name);
        Some(hit)
    })
}

/// Generic video-resolution API call embedded in a player page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    /// Origin hosting `video.php` and `api2.php`
    pub origin: String,
    pub id: String,
}

impl ApiCall {
    pub fn new(origin: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            id: id.into(),
        }
    }

    /// Endpoint that resolves the id to a file URL
    pub fn endpoint(&self) -> String {
        format!("{}/api2.php?id={}", self.origin, encode(&self.id))
    }

    /// Referer the endpoint expects
    pub fn referer(&self) -> String {
        format!("{}/video.php?id={}", self.origin, encode(&self.id))
    }

    /// Host name sent in the `d` form field
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.origin)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// First `…/video.php?id=` reference in `text`
pub fn find_api_call(text: &str) -> Option<ApiCall> {
    let text = unescape_slashes(text);
    let caps = API_CALL.captures(&text)?;
    let url = Url::parse(&caps[0]).ok()?;
    Some(ApiCall::new(url.origin().ascii_serialization(), &caps[1]))
}

/// `og:image` meta content, else a `poster` attribute
pub fn find_poster_url(text: &str) -> Option<String> {
    OG_IMAGE
        .captures(text)
        .or_else(|| POSTER_ATTR.captures(text))
        .map(|c| c[1].to_string())
        .filter(|p| !p.is_empty())
}

/// Embedded player URLs, absolute and deduplicated, in document order
/// per source kind (iframes, data attributes, selector options)
pub fn find_player_candidates(html: &str, base: &Url) -> Vec<String> {
    let iframes = IFRAME_SRC.captures_iter(html).map(|c| c[1].to_string());
    let data_attrs = DATA_PLAYER_ATTR.captures_iter(html).map(|c| c[1].to_string());
    let options = OPTION_VALUE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|v| v.starts_with("http") || v.starts_with('/'));

    let mut seen = HashSet::new();
    iframes
        .chain(data_attrs)
        .chain(options)
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with("javascript:") || raw.starts_with("about:") {
                return None;
            }
            base.join(raw).ok()
        })
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Id of a redirect-provider player: `v` parameter, else the segment after
/// `hydrax`, else the last path segment
pub fn redirect_id(player_url: &str) -> Option<String> {
    let url = Url::parse(player_url).ok()?;
    if let Some((_, v)) = url.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
        return Some(v.into_owned());
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().position(|s| *s == "hydrax")
        && let Some(next) = segments.get(pos + 1)
    {
        return Some((*next).to_string());
    }
    segments.last().map(|s| (*s).to_string())
}

/// Id for the resolution API: `id` parameter, else the last path segment
pub fn player_id(player_url: &str) -> Option<String> {
    let url = Url::parse(player_url).ok()?;
    if let Some((_, id)) = url.query_pairs().find(|(k, v)| k == "id" && !v.is_empty()) {
        return Some(id.into_owned());
    }
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
