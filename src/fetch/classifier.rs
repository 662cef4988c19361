//! Anti-bot challenge detection
//!
//! The rule set is plain data so it can be extended from configuration and
//! tested without any network access.

/// Markers that only appear on challenge interstitials
pub const DEFAULT_BLOCK_MARKERS: &[&str] = &[
    "attention required",
    "cloudflare",
    "cf-browser-verification",
    "just a moment",
    "turnstile",
    "cf-chl",
    "tunggu sebentar",
    "verifikasi keamanan",
];

/// Status codes that always mean the request was challenged
pub const DEFAULT_BLOCK_STATUSES: &[u16] = &[403, 503];

/// Challenge detection rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRules {
    statuses: Vec<u16>,
    markers: Vec<String>,
}

impl BlockRules {
    /// Rules with the given statuses and markers; markers are matched lowercased
    pub fn new(statuses: Vec<u16>, markers: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            statuses,
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Built-in rules plus extra markers from configuration
    pub fn with_extra_markers(extra: &[String]) -> Self {
        let mut rules = Self::default();
        for marker in extra {
            let marker = marker.trim().to_lowercase();
            if !marker.is_empty() && !rules.markers.contains(&marker) {
                rules.markers.push(marker);
            }
        }
        rules
    }

    /// Whether a response looks like a challenge page instead of content.
    ///
    /// A blocking status wins regardless of body; otherwise the body is
    /// searched case-insensitively for any marker.
    pub fn is_blocked(&self, body: &str, status: u16) -> bool {
        if self.statuses.contains(&status) {
            return true;
        }
        let lower = body.to_lowercase();
        self.markers.iter().any(|marker| lower.contains(marker.as_str()))
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for BlockRules {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_STATUSES.to_vec(), DEFAULT_BLOCK_MARKERS)
    }
}
