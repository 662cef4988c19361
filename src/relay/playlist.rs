//! HLS manifest rewriting
//!
//! Every resource a player would request while following a manifest is
//! pointed back at the relay, with the upstream URL made absolute.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use super::urls::RelayUrlBuilder;

static DOUBLE_QUOTED_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"URI="([^"]+)""#).expect("valid URI regex"));
static SINGLE_QUOTED_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"URI='([^']+)'"#).expect("valid URI regex"));

/// Rewrites manifest text so sub-resources route through the relay
#[derive(Debug, Clone, Default)]
pub struct PlaylistRewriter {
    urls: RelayUrlBuilder,
}

impl PlaylistRewriter {
    pub fn new(urls: RelayUrlBuilder) -> Self {
        Self { urls }
    }

    /// Rewrite `manifest`, resolving references against `base`.
    ///
    /// Tag lines keep everything but their quoted `URI` attribute; plain
    /// lines are replaced whole; blank lines pass through. Lines are joined
    /// with `\n`.
    pub fn rewrite(&self, manifest: &str, base: &Url, referer: Option<&str>) -> String {
        manifest
            .split('\n')
            .map(|line| self.rewrite_line(line.strip_suffix('\r').unwrap_or(line), base, referer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rewrite_line(&self, line: &str, base: &Url, referer: Option<&str>) -> String {
        if line.trim().is_empty() {
            return line.to_string();
        }

        if line.starts_with('#') {
            if !line.contains("URI=") {
                return line.to_string();
            }
            let line = self.replace_uri(&DOUBLE_QUOTED_URI, line, '"', base, referer);
            return self.replace_uri(&SINGLE_QUOTED_URI, &line, '\'', base, referer);
        }

        match base.join(line.trim()) {
            Ok(absolute) => self.urls.media(absolute.as_str(), referer),
            Err(e) => {
                tracing::debug!("Leaving unresolvable manifest line as-is ({}): {}", e, line);
                line.to_string()
            }
        }
    }

    fn replace_uri(
        &self,
        pattern: &Regex,
        line: &str,
        quote: char,
        base: &Url,
        referer: Option<&str>,
    ) -> String {
        pattern
            .replace_all(line, |caps: &Captures| match base.join(&caps[1]) {
                Ok(absolute) => format!(
                    "URI={quote}{}{quote}",
                    self.urls.media(absolute.as_str(), referer)
                ),
                Err(_) => caps[0].to_string(),
            })
            .into_owned()
    }
}
