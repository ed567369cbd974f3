//! Source descriptor types

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// One week, the default cache period for preset sources.
pub const DEFAULT_CACHE_PERIOD_SECS: u32 = 60 * 60 * 24 * 7;

/// First id handed out to user-defined sources.
pub const USER_DEFINED_ID_BASE: u32 = 100;

/// Numeric source identifier.
///
/// Preset sources use stable ids below [`USER_DEFINED_ID_BASE`]; ids at or
/// above it are assigned to user sources in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
    /// Whether this id belongs to the user-defined range.
    pub fn is_user_defined(&self) -> bool {
        self.0 >= USER_DEFINED_ID_BASE
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How cached tiles of a source age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Tiles older than the cache period are stale and refetched.
    HonorTtl,
    /// Cached tiles are reused indefinitely.
    #[default]
    NeverExpire,
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::HonorTtl => write!(f, "honor-ttl"),
            CachePolicy::NeverExpire => write!(f, "never-expire"),
        }
    }
}

/// A single placeholder recognised in URI templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriToken {
    /// `#X`: column
    X,
    /// `#Y`: row
    Y,
    /// `#Z`: zoom level
    Z,
    /// `#S`: inverted zoom (`max_zoom - zoom`)
    S,
    /// `#Q`: `t`-prefixed quadtree key over `qrts`
    Q,
    /// `#W`: numeric quadtree key over `0123`
    Q0,
    /// `#U`: signed Y addressing, not supported
    YS,
    /// `#R`: random shard digit `0..4`
    R,
    /// Not a template token: the URI points at a Google domain
    GoogleDomain,
    /// `#T`: random shard letter `a`, `b` or `c`
    T,
}

impl UriToken {
    /// All tokens in bit order, lowest first.
    pub const ALL: [UriToken; 10] = [
        UriToken::X,
        UriToken::Y,
        UriToken::Z,
        UriToken::S,
        UriToken::Q,
        UriToken::Q0,
        UriToken::YS,
        UriToken::R,
        UriToken::GoogleDomain,
        UriToken::T,
    ];

    /// Bit set in [`UriFormat`] when the token is present.
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Substring that marks the token in a template.
    pub const fn marker(self) -> &'static str {
        match self {
            UriToken::X => "#X",
            UriToken::Y => "#Y",
            UriToken::Z => "#Z",
            UriToken::S => "#S",
            UriToken::Q => "#Q",
            UriToken::Q0 => "#W",
            UriToken::YS => "#U",
            UriToken::R => "#R",
            UriToken::GoogleDomain => "google.com",
            UriToken::T => "#T",
        }
    }
}

/// Bitmask of the placeholders found in a URI template.
///
/// Computed once per source; presence, not count, sets a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UriFormat(u16);

impl UriFormat {
    /// Scans a template for every known marker.
    pub fn inspect(template: &str) -> Self {
        let bits = UriToken::ALL
            .iter()
            .filter(|token| template.contains(token.marker()))
            .fold(0u16, |acc, token| acc | token.bit());

        let format = UriFormat(bits);
        debug!(
            template,
            format = format_args!("{:#X}", bits),
            google = format.has(UriToken::GoogleDomain),
            "Inspected URI template"
        );
        format
    }

    /// Whether the given token was found.
    #[inline]
    pub fn has(&self, token: UriToken) -> bool {
        self.0 & token.bit() != 0
    }

    /// Raw bit representation.
    #[inline]
    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Present tokens from the lowest bit to the highest.
    pub fn tokens(&self) -> impl Iterator<Item = UriToken> + '_ {
        UriToken::ALL.into_iter().filter(move |t| self.has(*t))
    }
}

/// Errors raised while building or looking up sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// No preset or user source has this id.
    #[error("Unknown source id {0}")]
    UnknownId(SourceId),

    /// No source has this name.
    #[error("Unknown source name '{0}'")]
    UnknownName(String),

    /// Descriptor failed validation.
    #[error("Invalid source '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// A user source file could not be read or parsed.
    #[error("Cannot load user sources from {path}: {reason}")]
    UserFile { path: String, reason: String },
}

/// Everything needed to create a [`Source`].
///
/// This is what "add user source" accepts; it can also be loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Human-readable name, also used for friendly cache directories.
    pub name: String,
    /// URI template; `None` for sources that no longer serve tiles.
    #[serde(default)]
    pub uri_template: Option<String>,
    /// Image file suffix (`png`, `jpg`, ...).
    pub image_format: String,
    #[serde(default)]
    pub copyright_notice: Option<String>,
    #[serde(default)]
    pub copyright_url: Option<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Cache period in seconds.
    #[serde(default = "default_cache_period")]
    pub cache_period_secs: u32,
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

fn default_cache_period() -> u32 {
    DEFAULT_CACHE_PERIOD_SECS
}

impl SourceDescriptor {
    /// Creates a descriptor with the preset defaults: one-week period,
    /// never-expire policy and no copyright.
    pub fn new(
        name: impl Into<String>,
        uri_template: impl Into<String>,
        image_format: impl Into<String>,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            name: name.into(),
            uri_template: Some(uri_template.into()),
            image_format: image_format.into(),
            copyright_notice: None,
            copyright_url: None,
            min_zoom,
            max_zoom,
            cache_period_secs: DEFAULT_CACHE_PERIOD_SECS,
            cache_policy: CachePolicy::NeverExpire,
        }
    }

    /// Sets the copyright notice and URL.
    pub fn with_copyright(mut self, notice: impl Into<String>, url: impl Into<String>) -> Self {
        self.copyright_notice = Some(notice.into());
        self.copyright_url = Some(url.into());
        self
    }

    /// Sets the cache period and policy.
    pub fn with_cache(mut self, period_secs: u32, policy: CachePolicy) -> Self {
        self.cache_period_secs = period_secs;
        self.cache_policy = policy;
        self
    }

    /// Drops the URI template, leaving a placeholder source.
    pub fn without_uri(mut self) -> Self {
        self.uri_template = None;
        self
    }

    /// Checks the descriptor for obvious mistakes.
    pub fn validate(&self) -> Result<(), SourceError> {
        let invalid = |reason: &str| SourceError::InvalidDescriptor {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.image_format.trim().is_empty() {
            return Err(invalid("image format must not be empty"));
        }
        if self.min_zoom > self.max_zoom {
            return Err(invalid("min_zoom is greater than max_zoom"));
        }
        if self.max_zoom > crate::coord::MAX_ZOOM {
            return Err(invalid("max_zoom is beyond the addressable range"));
        }
        Ok(())
    }
}

/// An immutable tile source.
///
/// Only the `active` flag may change after creation.
#[derive(Debug)]
pub struct Source {
    id: SourceId,
    name: String,
    uri_template: Option<String>,
    image_format: String,
    copyright_notice: Option<String>,
    copyright_url: Option<String>,
    min_zoom: u8,
    max_zoom: u8,
    cache_period: Duration,
    cache_policy: CachePolicy,
    uri_format: UriFormat,
    active: AtomicBool,
}

impl Source {
    /// Builds a source and precomputes its placeholder bitmask.
    pub fn new(id: SourceId, descriptor: SourceDescriptor) -> Self {
        let uri_format = descriptor
            .uri_template
            .as_deref()
            .map(UriFormat::inspect)
            .unwrap_or_default();

        Self {
            id,
            name: descriptor.name,
            uri_template: descriptor.uri_template,
            image_format: descriptor.image_format,
            copyright_notice: descriptor.copyright_notice,
            copyright_url: descriptor.copyright_url,
            min_zoom: descriptor.min_zoom,
            max_zoom: descriptor.max_zoom,
            cache_period: Duration::from_secs(u64::from(descriptor.cache_period_secs)),
            cache_policy: descriptor.cache_policy,
            uri_format,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Friendly name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri_template(&self) -> Option<&str> {
        self.uri_template.as_deref()
    }

    /// Image file suffix used for cache files.
    pub fn image_format(&self) -> &str {
        &self.image_format
    }

    /// Copyright notice and URL, either of which may be missing.
    pub fn copyright(&self) -> (Option<&str>, Option<&str>) {
        (
            self.copyright_notice.as_deref(),
            self.copyright_url.as_deref(),
        )
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Checks if this source serves the given zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom && zoom <= self.max_zoom
    }

    pub fn cache_period(&self) -> Duration {
        self.cache_period
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn uri_format(&self) -> UriFormat {
        self.uri_format
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// A source can serve tiles when it is active and has a URI template.
    pub fn is_valid(&self) -> bool {
        self.is_active() && self.uri_template.is_some()
    }

    /// Returns a descriptor that would recreate this source.
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: self.name.clone(),
            uri_template: self.uri_template.clone(),
            image_format: self.image_format.clone(),
            copyright_notice: self.copyright_notice.clone(),
            copyright_url: self.copyright_url.clone(),
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            cache_period_secs: self.cache_period.as_secs() as u32,
            cache_policy: self.cache_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_xyz_template() {
        let format = UriFormat::inspect("http://tile.openstreetmap.org/#Z/#X/#Y.png");
        assert!(format.has(UriToken::X));
        assert!(format.has(UriToken::Y));
        assert!(format.has(UriToken::Z));
        assert!(!format.has(UriToken::Q));
        assert_eq!(format.bits(), 0b111);
    }

    #[test]
    fn test_inspect_counts_presence_not_occurrences() {
        let once = UriFormat::inspect("http://a/#Z/#X");
        let twice = UriFormat::inspect("http://a/z#Z/row#Y/#Z_#X-#Y.jpg");
        assert_eq!(once.bits() | UriToken::Y.bit(), twice.bits());
    }

    #[test]
    fn test_inspect_google_domain() {
        let format = UriFormat::inspect("http://khm#R.google.com/kh/v=51&x=#X&y=#Y&z=#Z");
        assert!(format.has(UriToken::GoogleDomain));
        assert!(format.has(UriToken::R));
        assert!(!format.has(UriToken::T));
    }

    #[test]
    fn test_tokens_iterate_in_bit_order() {
        let format = UriFormat::inspect("http://#T.example/#W/#Z");
        let tokens: Vec<_> = format.tokens().collect();
        assert_eq!(tokens, vec![UriToken::Z, UriToken::Q0, UriToken::T]);
    }

    #[test]
    fn test_token_bits_are_distinct() {
        let all = UriToken::ALL
            .iter()
            .fold(0u16, |acc, token| {
                assert_eq!(acc & token.bit(), 0);
                acc | token.bit()
            });
        assert_eq!(all, (1 << 10) - 1);
    }

    #[test]
    fn test_source_without_uri_is_not_valid() {
        let descriptor = SourceDescriptor::new("Gone", "", "png", 1, 17).without_uri();
        let source = Source::new(SourceId(3), descriptor);
        assert!(source.is_active());
        assert!(!source.is_valid());
        assert_eq!(source.uri_format(), UriFormat::default());
    }

    #[test]
    fn test_active_flag_toggles() {
        let source = Source::new(
            SourceId(1),
            SourceDescriptor::new("OSM", "http://a/#Z/#X/#Y.png", "png", 1, 18),
        );
        assert!(source.is_valid());
        source.set_active(false);
        assert!(!source.is_valid());
    }

    #[test]
    fn test_validate_rejects_inverted_zoom_range() {
        let descriptor = SourceDescriptor::new("Bad", "http://a/#Z", "png", 10, 2);
        assert!(matches!(
            descriptor.validate(),
            Err(SourceError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let json = r#"{
            "name": "Local",
            "uri_template": "http://localhost/#Z/#X/#Y.png",
            "image_format": "png",
            "min_zoom": 0,
            "max_zoom": 19
        }"#;
        let descriptor: SourceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.cache_period_secs, DEFAULT_CACHE_PERIOD_SECS);
        assert_eq!(descriptor.cache_policy, CachePolicy::NeverExpire);
    }

    #[test]
    fn test_cache_policy_json_names() {
        let policy: CachePolicy = serde_json::from_str("\"honor-ttl\"").unwrap();
        assert_eq!(policy, CachePolicy::HonorTtl);
        assert_eq!(policy.to_string(), "honor-ttl");
    }
}
