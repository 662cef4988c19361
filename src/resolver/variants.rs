//! Adaptive-bitrate variant extraction from master manifests

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::{Error, Result, types::StreamVariant};

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Z0-9-]+)=("[^"]*"|[^,]*)"#).expect("valid attribute regex"));

/// Attribute list of one `#EXT-X-STREAM-INF` tag
pub type Attributes = HashMap<String, String>;

/// Parse the attribute list of a stream-info line.
///
/// # Errors
///
/// [`Error::ManifestParseSkip`] when the line carries no attributes.
pub fn parse_stream_inf(line: &str) -> Result<Attributes> {
    let raw = line.strip_prefix(STREAM_INF).unwrap_or(line);
    let attrs: Attributes = ATTRIBUTE
        .captures_iter(raw)
        .map(|caps| {
            let value = &caps[2];
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            (caps[1].to_string(), value.to_string())
        })
        .collect();

    if attrs.is_empty() {
        return Err(Error::manifest_skip(line));
    }
    Ok(attrs)
}

fn height_of(attrs: &Attributes) -> Option<u32> {
    attrs
        .get("RESOLUTION")
        .and_then(|r| r.split('x').nth(1))
        .and_then(|h| h.trim().parse().ok())
}

fn bandwidth_of(attrs: &Attributes) -> Option<u64> {
    attrs.get("BANDWIDTH").and_then(|b| b.trim().parse().ok())
}

/// Display label: `NAME`, else `{height}p`, else `{kbps}kbps`, else `Stream`
pub fn quality_label(attrs: &Attributes) -> String {
    if let Some(name) = attrs.get("NAME").filter(|n| !n.is_empty()) {
        return name.clone();
    }
    if let Some(height) = height_of(attrs) {
        return format!("{}p", height);
    }
    if let Some(bandwidth) = bandwidth_of(attrs) {
        return format!("{}kbps", (bandwidth as f64 / 1000.0).round() as u64);
    }
    "Stream".to_string()
}

/// Variants of a master manifest, in manifest order, deduplicated by URL.
///
/// Each stream-info tag is paired with the next non-comment line. Malformed
/// tags and unresolvable references are skipped.
pub fn parse_variants(manifest: &str, base: &Url) -> Vec<StreamVariant> {
    let mut variants = Vec::new();
    let mut seen = HashSet::new();
    let mut pending: Option<Attributes> = None;

    for line in manifest.lines() {
        if line.starts_with(STREAM_INF) {
            pending = match parse_stream_inf(line) {
                Ok(attrs) => Some(attrs),
                Err(e) => {
                    tracing::debug!("{}", e);
                    None
                }
            };
            continue;
        }

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(attrs) = pending.take() else {
            continue;
        };
        let Ok(url) = base.join(line.trim()) else {
            continue;
        };
        let url = url.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        variants.push(StreamVariant {
            label: quality_label(&attrs),
            url,
            height_px: height_of(&attrs),
            bandwidth_bps: bandwidth_of(&attrs),
        });
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn base() -> Url {
        Url::parse("https://cdn.example/master.m3u8").unwrap()
    }

    #[test]
    fn test_two_variants_labeled_by_height() {
        let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\nlow/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720\nhigh/index.m3u8";

        let variants = parse_variants(manifest, &base());

        assert_eq!(
            variants,
            vec![
                StreamVariant {
                    label: "360p".to_string(),
                    url: "https://cdn.example/low/index.m3u8".to_string(),
                    height_px: Some(360),
                    bandwidth_bps: Some(800_000),
                },
                StreamVariant {
                    label: "720p".to_string(),
                    url: "https://cdn.example/high/index.m3u8".to_string(),
                    height_px: Some(720),
                    bandwidth_bps: Some(2_000_000),
                },
            ]
        );
    }

    #[rstest]
    #[case(r#"#EXT-X-STREAM-INF:NAME="HD",RESOLUTION=1280x720"#, "HD")]
    #[case("#EXT-X-STREAM-INF:RESOLUTION=1920x1080,BANDWIDTH=5000000", "1080p")]
    #[case("#EXT-X-STREAM-INF:BANDWIDTH=799500", "800kbps")]
    #[case("#EXT-X-STREAM-INF:CODECS=\"avc1.4d401f\"", "Stream")]
    #[case("#EXT-X-STREAM-INF:RESOLUTION=widexhigh,BANDWIDTH=64000", "64kbps")]
    fn test_quality_label(#[case] line: &str, #[case] expected: &str) {
        let attrs = parse_stream_inf(line).unwrap();
        assert_eq!(quality_label(&attrs), expected);
    }

    #[test]
    fn test_quoted_values_keep_commas() {
        let attrs =
            parse_stream_inf(r#"#EXT-X-STREAM-INF:CODECS="avc1.64001f,mp4a.40.2",BANDWIDTH=1"#)
                .unwrap();
        assert_eq!(attrs["CODECS"], "avc1.64001f,mp4a.40.2");
        assert_eq!(attrs["BANDWIDTH"], "1");
    }

    #[test]
    fn test_malformed_block_skipped_without_aborting() {
        let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:garbage\nbad/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=500000\ngood/index.m3u8\n";

        assert!(matches!(
            parse_stream_inf("#EXT-X-STREAM-INF:garbage"),
            Err(Error::ManifestParseSkip { .. })
        ));

        let variants = parse_variants(manifest, &base());
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].url, "https://cdn.example/good/index.m3u8");
        assert_eq!(variants[0].label, "500kbps");
    }

    #[test]
    fn test_duplicates_removed_first_wins() {
        let manifest = "#EXT-X-STREAM-INF:RESOLUTION=640x360\na.m3u8\n#EXT-X-STREAM-INF:RESOLUTION=1280x720\nhttps://cdn.example/a.m3u8\n#EXT-X-STREAM-INF:RESOLUTION=1920x1080\nb.m3u8";

        let variants = parse_variants(manifest, &base());
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["360p", "1080p"]);
    }

    #[test]
    fn test_media_playlist_has_no_variants() {
        let manifest = "#EXTM3U\n#EXTINF:4,\nseg0.ts\n#EXTINF:4,\nseg1.ts";
        assert!(parse_variants(manifest, &base()).is_empty());
    }
}
