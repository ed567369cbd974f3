//! URI templating
//!
//! Expands the `#`-tokens of a source's URI template for one tile. Tokens
//! are visited in bit order, lowest first; each present token is computed
//! once and every occurrence of it is replaced.

use rand::Rng;
use tracing::{trace, warn};

use super::types::{Source, UriToken};
use crate::coord::{quadtree_digits, quadtree_key, TileCoord};

/// Letters used by the `#T` shard token.
const SHARD_LETTERS: [char; 3] = ['a', 'b', 'c'];

/// Number of distinct `#R` shard digits.
const SHARD_DIGITS: u32 = 4;

/// Picks the server shard for load-balanced templates.
pub trait ShardPicker {
    /// Digit for `#R`, in `0..4`.
    fn shard_digit(&mut self) -> u32;

    /// Letter for `#T`, one of `a`, `b`, `c`.
    fn shard_letter(&mut self) -> char;
}

/// Picks shards with the thread-local RNG, re-rolled on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShardPicker;

impl ShardPicker for RandomShardPicker {
    fn shard_digit(&mut self) -> u32 {
        rand::rng().random_range(0..SHARD_DIGITS)
    }

    fn shard_letter(&mut self) -> char {
        SHARD_LETTERS[rand::rng().random_range(0..SHARD_LETTERS.len())]
    }
}

/// Builds the download URI of a tile with random shards.
///
/// Returns `None` when the source has no URI template.
///
/// # Example
///
/// ```
/// use tilecache::source::{build_uri, Source, SourceDescriptor, SourceId};
///
/// let source = Source::new(
///     SourceId(100),
///     SourceDescriptor::new("Example", "http://example/#Z/#X/#Y.png", "png", 0, 18),
/// );
/// assert_eq!(
///     build_uri(&source, 3, 2, 5).as_deref(),
///     Some("http://example/3/2/5.png")
/// );
/// ```
pub fn build_uri(source: &Source, zoom: u8, x: u32, y: u32) -> Option<String> {
    build_uri_with(source, zoom, x, y, &mut RandomShardPicker)
}

/// Builds the download URI of a tile, drawing shards from `shards`.
pub fn build_uri_with(
    source: &Source,
    zoom: u8,
    x: u32,
    y: u32,
    shards: &mut impl ShardPicker,
) -> Option<String> {
    let template = source.uri_template()?;
    let tile = TileCoord::new(zoom, x, y);
    let mut uri = template.to_string();

    for token in source.uri_format().tokens() {
        let replacement = match token {
            UriToken::X => x.to_string(),
            UriToken::Y => y.to_string(),
            UriToken::Z => zoom.to_string(),
            UriToken::S => source.max_zoom().saturating_sub(zoom).to_string(),
            UriToken::Q => quadtree_key(&tile),
            UriToken::Q0 => quadtree_digits(&tile),
            UriToken::R => shards.shard_digit().to_string(),
            UriToken::T => shards.shard_letter().to_string(),
            UriToken::YS => {
                warn!(
                    source = source.name(),
                    "Signed Y (#U) is not supported, token left in URI"
                );
                continue;
            }
            UriToken::GoogleDomain => continue,
        };
        uri = uri.replace(token.marker(), &replacement);
    }

    trace!(source = source.name(), tile = %tile, uri = %uri, "Built tile URI");
    Some(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceDescriptor, SourceId};
    use proptest::prelude::*;

    struct FixedShards;

    impl ShardPicker for FixedShards {
        fn shard_digit(&mut self) -> u32 {
            2
        }

        fn shard_letter(&mut self) -> char {
            'b'
        }
    }

    fn source(template: &str) -> Source {
        Source::new(
            SourceId(100),
            SourceDescriptor::new("Test", template, "png", 1, 18),
        )
    }

    #[test]
    fn test_xyz_substitution() {
        let s = source("http://example/#Z/#X/#Y.png");
        assert_eq!(
            build_uri(&s, 3, 2, 5).unwrap(),
            "http://example/3/2/5.png"
        );
    }

    #[test]
    fn test_repeated_tokens_are_all_replaced() {
        let s = source("http://maps-for-free.com/layer/relief/z#Z/row#Y/#Z_#X-#Y.jpg");
        assert_eq!(
            build_uri(&s, 7, 64, 40).unwrap(),
            "http://maps-for-free.com/layer/relief/z7/row40/7_64-40.jpg"
        );
    }

    #[test]
    fn test_inverted_zoom() {
        let s = source("http://a/#S/#X/#Y");
        assert_eq!(build_uri(&s, 5, 1, 2).unwrap(), "http://a/13/1/2");
    }

    #[test]
    fn test_quadtree_tokens() {
        let s = source("http://a/#Q?w=#W");
        assert_eq!(build_uri(&s, 2, 1, 1).unwrap(), "http://a/tqs?w=03");
    }

    #[test]
    fn test_shard_tokens_use_picker() {
        let s = source("http://#T.tiles/#Z?mt=#R");
        assert_eq!(
            build_uri_with(&s, 4, 0, 0, &mut FixedShards).unwrap(),
            "http://b.tiles/4?mt=2"
        );
    }

    #[test]
    fn test_random_shards_stay_in_range() {
        let s = source("http://#T#R/");
        for _ in 0..64 {
            let uri = build_uri(&s, 1, 0, 0).unwrap();
            let bytes = uri.as_bytes();
            assert!(matches!(bytes[7], b'a' | b'b' | b'c'), "{}", uri);
            assert!(matches!(bytes[8], b'0'..=b'3'), "{}", uri);
        }
    }

    #[test]
    fn test_signed_y_is_left_untouched() {
        let s = source("http://a/#Z/#U");
        assert_eq!(build_uri(&s, 3, 1, 1).unwrap(), "http://a/3/#U");
    }

    #[test]
    fn test_unknown_tokens_are_not_substituted() {
        let s = source("http://a/#Z/#K/#X");
        assert_eq!(build_uri(&s, 3, 1, 1).unwrap(), "http://a/3/#K/1");
    }

    #[test]
    fn test_google_marker_is_not_a_substitution() {
        let s = source("http://mt#R.google.com/vt?x=#X&y=#Y&z=#Z");
        assert_eq!(
            build_uri_with(&s, 3, 1, 2, &mut FixedShards).unwrap(),
            "http://mt2.google.com/vt?x=1&y=2&z=3"
        );
    }

    #[test]
    fn test_source_without_template() {
        let s = Source::new(
            SourceId(9),
            SourceDescriptor::new("Gone", "", "png", 1, 17).without_uri(),
        );
        assert_eq!(build_uri(&s, 3, 1, 1), None);
    }

    proptest! {
        #[test]
        fn prop_build_uri_is_deterministic_without_shards(zoom in 0u8..=18, x in 0u32..300_000, y in 0u32..300_000) {
            let s = source("http://example/#Z/#X/#Y.png?q=#Q&s=#S");
            prop_assert_eq!(build_uri(&s, zoom, x, y), build_uri(&s, zoom, x, y));
        }
    }
}
