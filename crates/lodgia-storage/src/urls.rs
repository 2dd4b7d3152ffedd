//! Public URL construction for stored media.
//!
//! Response shaping maps internal storage keys to public URLs. The
//! passthrough builder returns keys untouched (useful behind a proxy that
//! mounts the bucket); the CDN builder targets Cloudflare-style image
//! resizing with per-variant transformation options.

use lodgia_core::models::MediaUrlVariants;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Maps an internal storage key to public URL(s).
pub trait MediaUrlBuilder: Send + Sync {
    fn build_public_url(&self, key: &str) -> String;
    fn build_lodging_variants(&self, key: &str) -> MediaUrlVariants;
}

/// Returns keys as-is.
pub struct PassthroughUrlBuilder;

impl MediaUrlBuilder for PassthroughUrlBuilder {
    fn build_public_url(&self, key: &str) -> String {
        key.to_string()
    }

    fn build_lodging_variants(&self, key: &str) -> MediaUrlVariants {
        MediaUrlVariants {
            thumb: key.to_string(),
            card: key.to_string(),
            hero: key.to_string(),
        }
    }
}

// encodeURIComponent's unreserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const THUMB_OPTIONS: &str = "width=320,height=240,fit=cover,quality=80,format=auto";
const CARD_OPTIONS: &str = "width=640,height=420,fit=cover,quality=82,format=auto";
const HERO_OPTIONS: &str = "width=1600,height=900,fit=cover,quality=85,format=auto";

/// Builds CDN URLs: `{base}/{key}` for originals and
/// `{base}/cdn-cgi/image/{options}/{key}` for resized variants.
pub struct CdnUrlBuilder {
    base_url: String,
}

impl CdnUrlBuilder {
    pub fn new(base_url: &str) -> Self {
        CdnUrlBuilder {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn transformation_url(&self, options: &str, normalized_key: &str) -> String {
        format!("{}/cdn-cgi/image/{}/{}", self.base_url, options, normalized_key)
    }

    fn normalize_key(&self, key: &str) -> String {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, COMPONENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl MediaUrlBuilder for CdnUrlBuilder {
    fn build_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, self.normalize_key(key))
    }

    fn build_lodging_variants(&self, key: &str) -> MediaUrlVariants {
        let normalized_key = self.normalize_key(key);
        MediaUrlVariants {
            thumb: self.transformation_url(THUMB_OPTIONS, &normalized_key),
            card: self.transformation_url(CARD_OPTIONS, &normalized_key),
            hero: self.transformation_url(HERO_OPTIONS, &normalized_key),
        }
    }
}
