//! Same-origin relay URLs

use url::form_urlencoded;

pub const MEDIA_RELAY_PATH: &str = "/relay/media";
pub const IMAGE_RELAY_PATH: &str = "/relay/image";

/// Builds relay URLs that carry the upstream URL and referer as query parameters
#[derive(Debug, Clone)]
pub struct RelayUrlBuilder {
    media_path: String,
    image_path: String,
}

impl RelayUrlBuilder {
    pub fn new(media_path: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            media_path: media_path.into(),
            image_path: image_path.into(),
        }
    }

    /// Relay URL for a media resource (manifest, segment, key or file)
    pub fn media(&self, url: &str, referer: Option<&str>) -> String {
        Self::build(&self.media_path, url, referer)
    }

    /// Relay URL for an image
    pub fn image(&self, url: &str, referer: Option<&str>) -> String {
        Self::build(&self.image_path, url, referer)
    }

    fn build(path: &str, url: &str, referer: Option<&str>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("url", url);
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            query.append_pair("referer", referer);
        }
        format!("{}?{}", path, query.finish())
    }
}

impl Default for RelayUrlBuilder {
    fn default() -> Self {
        Self::new(MEDIA_RELAY_PATH, IMAGE_RELAY_PATH)
    }
}
