//! Cache directory modes and tile path construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use md5::{Digest, Md5};

use crate::source::Source;

const NONE_SCHEME: &str = "none://";
const AUTO_SCHEME: &str = "auto://";
const FRIENDLY_SCHEME: &str = "friendly://";

/// How the per-source cache root is derived from the configured directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheDirMode {
    /// `none://`: no disk cache.
    #[default]
    Disabled,
    /// `auto://<base>`: `<base>/<md5 hex of the URI template>`.
    Auto(PathBuf),
    /// `friendly://<base>`: `<base>/<source name>`.
    Friendly(PathBuf),
    /// A literal path: `<path>/<source name>`.
    Path(PathBuf),
}

impl CacheDirMode {
    /// Parses a configured cache directory string.
    ///
    /// An empty string disables the cache like `none://` does.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.starts_with(NONE_SCHEME) {
            CacheDirMode::Disabled
        } else if let Some(base) = value.strip_prefix(AUTO_SCHEME) {
            CacheDirMode::Auto(PathBuf::from(base))
        } else if let Some(base) = value.strip_prefix(FRIENDLY_SCHEME) {
            CacheDirMode::Friendly(PathBuf::from(base))
        } else {
            CacheDirMode::Path(PathBuf::from(value))
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheDirMode::Disabled)
    }

    /// Cache root for one source, or `None` when disabled.
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use tilecache::cache::CacheDirMode;
    /// use tilecache::source::{Source, SourceDescriptor, SourceId};
    ///
    /// let source = Source::new(
    ///     SourceId(100),
    ///     SourceDescriptor::new("Local", "http://localhost/#Z/#X/#Y.png", "png", 0, 18),
    /// );
    /// let mode = CacheDirMode::parse("friendly:///var/tiles");
    /// assert_eq!(mode.cache_root(&source), Some(PathBuf::from("/var/tiles/Local")));
    /// ```
    pub fn cache_root(&self, source: &Source) -> Option<PathBuf> {
        match self {
            CacheDirMode::Disabled => None,
            CacheDirMode::Auto(base) => {
                let key = source.uri_template().unwrap_or(source.name());
                Some(base.join(md5_hex(key)))
            }
            CacheDirMode::Friendly(base) | CacheDirMode::Path(base) => {
                Some(base.join(source.name()))
            }
        }
    }
}

impl FromStr for CacheDirMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CacheDirMode::parse(s))
    }
}

impl fmt::Display for CacheDirMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheDirMode::Disabled => write!(f, "{}", NONE_SCHEME),
            CacheDirMode::Auto(base) => write!(f, "{}{}", AUTO_SCHEME, base.display()),
            CacheDirMode::Friendly(base) => write!(f, "{}{}", FRIENDLY_SCHEME, base.display()),
            CacheDirMode::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

fn md5_hex(value: &str) -> String {
    format!("{:x}", Md5::digest(value.as_bytes()))
}

/// Construct the on-disk path of a tile.
///
/// ```text
/// <cache_root>/<zoom>/<x>/<y>.<format>
/// ```
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use tilecache::cache::build_cache_path;
///
/// let path = build_cache_path(Path::new("/cache/osm"), "png", 3, 2, 5);
/// assert_eq!(path, PathBuf::from("/cache/osm/3/2/5.png"));
/// ```
pub fn build_cache_path(cache_root: &Path, format: &str, zoom: u8, x: u32, y: u32) -> PathBuf {
    cache_root
        .join(zoom.to_string())
        .join(x.to_string())
        .join(format!("{}.{}", y, format))
}

/// Identifier of a tile when no disk cache is configured.
///
/// Relative, so it never collides with a real cache file.
pub fn relative_tile_id(source: &Source, zoom: u8, x: u32, y: u32) -> PathBuf {
    build_cache_path(Path::new(source.name()), source.image_format(), zoom, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceDescriptor, SourceId};
    use proptest::prelude::*;

    fn osm() -> Source {
        Source::new(
            SourceId(1),
            SourceDescriptor::new(
                "OpenStreetMap I",
                "http://tile.openstreetmap.org/#Z/#X/#Y.png",
                "png",
                1,
                18,
            ),
        )
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(CacheDirMode::parse("none://"), CacheDirMode::Disabled);
        assert_eq!(CacheDirMode::parse(""), CacheDirMode::Disabled);
        assert_eq!(
            CacheDirMode::parse("auto:///tmp/maps"),
            CacheDirMode::Auto(PathBuf::from("/tmp/maps"))
        );
        assert_eq!(
            CacheDirMode::parse("friendly:///tmp/maps"),
            CacheDirMode::Friendly(PathBuf::from("/tmp/maps"))
        );
        assert_eq!(
            CacheDirMode::parse("/srv/tiles"),
            CacheDirMode::Path(PathBuf::from("/srv/tiles"))
        );
    }

    #[test]
    fn test_display_roundtrips() {
        for value in ["none://", "auto:///a/b", "friendly:///a/b", "/a/b"] {
            assert_eq!(CacheDirMode::parse(value).to_string(), value);
        }
    }

    #[test]
    fn test_disabled_has_no_root() {
        assert_eq!(CacheDirMode::Disabled.cache_root(&osm()), None);
    }

    #[test]
    fn test_auto_root_is_md5_of_template() {
        let root = CacheDirMode::parse("auto:///maps").cache_root(&osm()).unwrap();
        let expected = md5_hex("http://tile.openstreetmap.org/#Z/#X/#Y.png");
        assert_eq!(root, PathBuf::from("/maps").join(&expected));
        assert_eq!(expected.len(), 32);
    }

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_literal_path_uses_friendly_name() {
        let root = CacheDirMode::parse("/maps").cache_root(&osm()).unwrap();
        assert_eq!(root, PathBuf::from("/maps/OpenStreetMap I"));
    }

    #[test]
    fn test_build_cache_path() {
        let path = build_cache_path(Path::new("/root"), "png", 3, 2, 5);
        assert_eq!(path, PathBuf::from("/root/3/2/5.png"));
    }

    #[test]
    fn test_relative_tile_id() {
        let id = relative_tile_id(&osm(), 4, 8, 5);
        assert_eq!(id, PathBuf::from("OpenStreetMap I/4/8/5.png"));
        assert!(id.is_relative());
    }

    proptest! {
        #[test]
        fn prop_cache_path_is_deterministic(zoom in 0u8..=20, x in 0u32..1_000_000, y in 0u32..1_000_000) {
            let a = build_cache_path(Path::new("/c"), "jpg", zoom, x, y);
            let b = build_cache_path(Path::new("/c"), "jpg", zoom, x, y);
            prop_assert_eq!(&a, &b);
            let expected_suffix = format!("{}/{}/{}.jpg", zoom, x, y);
            prop_assert!(a.ends_with(expected_suffix));
        }
    }
}
