//! Playlist data model.
//!
//! A parsed playlist is either a [`MasterPlaylist`] listing variant streams or
//! a [`MediaPlaylist`] listing segments. All URLs stored here are already
//! resolved against the playlist URL.

use media_types::Resolution;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

impl Playlist {
    pub fn base_url(&self) -> &str {
        match self {
            Playlist::Master(master) => &master.base_url,
            Playlist::Media(media) => &media.base_url,
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, Playlist::Master(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterPlaylist {
    pub base_url: String,
    pub variants: Vec<Variant>,
}

impl MasterPlaylist {
    /// The variant with the highest bandwidth; the first one wins ties.
    pub fn select_variant(&self) -> Option<&Variant> {
        self.variants
            .iter()
            .reduce(|best, v| if v.bandwidth > best.bandwidth { v } else { best })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variant {
    pub url: String,
    pub bandwidth: u64,
    /// Raw `RESOLUTION` attribute, e.g. `1280x720`.
    pub resolution: Option<String>,
    pub codecs: Option<String>,
    pub name: Option<String>,
}

impl Variant {
    pub fn resolution_dimensions(&self) -> Option<Resolution> {
        self.resolution.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlaylistType {
    Vod,
    Event,
    Other(String),
}

impl PlaylistType {
    pub fn from_tag_value(value: &str) -> Self {
        match value {
            "VOD" => PlaylistType::Vod,
            "EVENT" => PlaylistType::Event,
            other => PlaylistType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlaylistType::Vod => "VOD",
            PlaylistType::Event => "EVENT",
            PlaylistType::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MediaPlaylist {
    pub base_url: String,
    /// `#EXT-X-TARGETDURATION` in seconds (10 when absent).
    pub target_duration: u64,
    pub media_sequence: u64,
    pub segments: Vec<Segment>,
    pub end_list: bool,
    pub playlist_type: Option<PlaylistType>,
}

impl MediaPlaylist {
    /// Sum of all segment durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn total_duration_us(&self) -> i64 {
        (self.total_duration() * 1_000_000.0).round() as i64
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_vod(&self) -> bool {
        self.playlist_type == Some(PlaylistType::Vod)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub url: String,
    /// `#EXTINF` duration in seconds.
    pub duration: f64,
    pub sequence_number: u64,
    pub title: Option<String>,
    pub byte_range_offset: Option<u64>,
    pub byte_range_length: Option<u64>,
    pub encryption: Option<EncryptionInfo>,
    pub discontinuity: bool,
}

impl Segment {
    /// Inclusive `(first, last)` byte positions when both range fields are set
    /// and the last byte fits in a `u64`.
    pub fn byte_range(&self) -> Option<(u64, u64)> {
        let offset = self.byte_range_offset?;
        let last = offset.checked_add(self.byte_range_length?.checked_sub(1)?)?;
        Some((offset, last))
    }

    /// `Range` header value for this segment, e.g. `bytes=100-199`.
    pub fn range_header(&self) -> Option<String> {
        self.byte_range()
            .map(|(first, last)| format!("bytes={first}-{last}"))
    }
}

/// `#EXT-X-KEY` metadata. Parsed and carried, never applied to segment bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncryptionInfo {
    pub method: String,
    pub key_url: String,
    pub iv: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(url: &str, bandwidth: u64) -> Variant {
        Variant {
            url: url.to_string(),
            bandwidth,
            resolution: None,
            codecs: None,
            name: None,
        }
    }

    fn segment(duration: f64, sequence_number: u64) -> Segment {
        Segment {
            url: format!("https://example.com/{sequence_number}.ts"),
            duration,
            sequence_number,
            title: None,
            byte_range_offset: None,
            byte_range_length: None,
            encryption: None,
            discontinuity: false,
        }
    }

    #[test]
    fn selects_highest_bandwidth_variant() {
        let master = MasterPlaylist {
            base_url: "https://example.com/master.m3u8".into(),
            variants: vec![variant("low", 500), variant("high", 1200), variant("mid", 900)],
        };
        assert_eq!(master.select_variant().unwrap().url, "high");
    }

    #[test]
    fn bandwidth_ties_keep_first_variant() {
        let master = MasterPlaylist {
            base_url: String::new(),
            variants: vec![variant("a", 800), variant("b", 800), variant("c", 100)],
        };
        assert_eq!(master.select_variant().unwrap().url, "a");
        assert!(
            MasterPlaylist {
                base_url: String::new(),
                variants: vec![],
            }
            .select_variant()
            .is_none()
        );
    }

    #[test]
    fn media_playlist_totals() {
        let media = MediaPlaylist {
            base_url: String::new(),
            target_duration: 10,
            media_sequence: 0,
            segments: vec![segment(10.0, 0), segment(9.5, 1), segment(4.25, 2)],
            end_list: true,
            playlist_type: Some(PlaylistType::Vod),
        };
        assert_eq!(media.total_duration(), 23.75);
        assert_eq!(media.total_duration_us(), 23_750_000);
        assert_eq!(media.segment_count(), 3);
        assert!(media.is_vod());
    }

    #[test]
    fn range_header_requires_offset_and_length() {
        let mut s = segment(1.0, 0);
        assert_eq!(s.range_header(), None);
        s.byte_range_length = Some(100);
        assert_eq!(s.range_header(), None);
        s.byte_range_offset = Some(200);
        assert_eq!(s.range_header().as_deref(), Some("bytes=200-299"));
    }

    #[test]
    fn unrepresentable_byte_range_has_no_header() {
        let mut s = segment(1.0, 0);
        s.byte_range_offset = Some(u64::MAX);
        s.byte_range_length = Some(2);
        assert_eq!(s.byte_range(), None);
        assert_eq!(s.range_header(), None);

        s.byte_range_length = Some(0);
        assert_eq!(s.byte_range(), None);

        s.byte_range_length = Some(1);
        assert_eq!(s.byte_range(), Some((u64::MAX, u64::MAX)));
    }

    #[test]
    fn variant_resolution_dimensions() {
        let mut v = variant("x", 1);
        v.resolution = Some("1920x1080".into());
        assert_eq!(v.resolution_dimensions(), Some(Resolution::new(1920, 1080)));
        v.resolution = Some("bogus".into());
        assert_eq!(v.resolution_dimensions(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn playlist_serializes_to_json() {
        let playlist = Playlist::Media(MediaPlaylist {
            base_url: "https://example.com/media.m3u8".into(),
            target_duration: 10,
            media_sequence: 7,
            segments: vec![segment(10.0, 7)],
            end_list: true,
            playlist_type: Some(PlaylistType::Vod),
        });
        let json = serde_json::to_string(&playlist).unwrap();
        assert!(json.contains("\"media_sequence\":7"));
        let back: Playlist = serde_json::from_str(&json).unwrap();
        assert_eq!(back, playlist);
    }
}
