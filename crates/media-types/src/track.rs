use bytes::Bytes;

use crate::{Resolution, avc_config_nal_units, split_annex_b};

/// Fallback dimensions used when the demuxer reports a zero-sized video track.
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

/// Fallback sample rate used when the demuxer reports `0`.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Fallback channel count used when the demuxer reports `0`.
pub const DEFAULT_CHANNEL_COUNT: u32 = 2;

/// Elementary stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackType {
    Audio,
    Video,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Audio => "audio",
            TrackType::Video => "video",
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format of one elementary stream discovered by probing the first segment.
///
/// Video tracks carry `width`/`height`, audio tracks carry `sample_rate` and
/// `channel_count`; the fields that do not apply are `0`. `extra_data` holds
/// codec initialization data (SPS/PPS for AVC, AudioSpecificConfig for AAC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFormat {
    pub track_type: TrackType,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channel_count: u32,
    pub extra_data: Option<Bytes>,
}

impl TrackFormat {
    pub const MIME_AVC: &'static str = "video/avc";
    pub const MIME_HEVC: &'static str = "video/hevc";
    pub const MIME_AAC: &'static str = "audio/mp4a-latm";
    pub const MIME_AAC_ADTS: &'static str = "audio/aac";

    pub fn video(mime_type: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            track_type: TrackType::Video,
            mime_type: mime_type.into(),
            width,
            height,
            sample_rate: 0,
            channel_count: 0,
            extra_data: None,
        }
    }

    pub fn audio(mime_type: impl Into<String>, sample_rate: u32, channel_count: u32) -> Self {
        Self {
            track_type: TrackType::Audio,
            mime_type: mime_type.into(),
            width: 0,
            height: 0,
            sample_rate,
            channel_count,
            extra_data: None,
        }
    }

    pub fn with_extra_data(mut self, extra_data: impl Into<Bytes>) -> Self {
        self.extra_data = Some(extra_data.into());
        self
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        self.track_type == TrackType::Video
    }

    #[inline]
    pub fn is_audio(&self) -> bool {
        self.track_type == TrackType::Audio
    }

    /// AAC carried either as raw access units or with ADTS framing.
    pub fn is_aac(&self) -> bool {
        self.mime_type == Self::MIME_AAC || self.mime_type == Self::MIME_AAC_ADTS
    }

    pub fn is_avc(&self) -> bool {
        self.mime_type == Self::MIME_AVC
    }

    /// Video dimensions, falling back to 1920x1080 when either is unknown.
    pub fn effective_resolution(&self) -> Resolution {
        let width = if self.width > 0 {
            self.width
        } else {
            DEFAULT_RESOLUTION.width
        };
        let height = if self.height > 0 {
            self.height
        } else {
            DEFAULT_RESOLUTION.height
        };
        Resolution::new(width, height)
    }

    pub fn effective_sample_rate(&self) -> u32 {
        if self.sample_rate > 0 {
            self.sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        }
    }

    pub fn effective_channel_count(&self) -> u32 {
        if self.channel_count > 0 {
            self.channel_count
        } else {
            DEFAULT_CHANNEL_COUNT
        }
    }

    /// Codec initialization buffers in the form decoders expect.
    ///
    /// AVC extra data is split into individual NAL units, either from an
    /// Annex-B byte stream or from an `avcC` record. Everything else is passed
    /// through as a single buffer. Empty or missing extra data yields an empty
    /// list.
    pub fn initialization_data(&self) -> Vec<Bytes> {
        let Some(extra) = self.extra_data.as_ref().filter(|d| !d.is_empty()) else {
            return Vec::new();
        };

        if self.is_video() && self.is_avc() {
            if let Some(units) = split_annex_b(extra) {
                return units;
            }
            return avc_config_nal_units(extra).unwrap_or_default();
        }

        vec![extra.clone()]
    }
}

impl std::fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extra = self.extra_data.as_ref().map_or(0, |d| d.len());
        match self.track_type {
            TrackType::Video => write!(
                f,
                "video {} {}x{} (extra_data={extra} bytes)",
                self.mime_type, self.width, self.height
            ),
            TrackType::Audio => write!(
                f,
                "audio {} {}Hz {}ch (extra_data={extra} bytes)",
                self.mime_type, self.sample_rate, self.channel_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallbacks_apply_only_to_unknown_values() {
        let v = TrackFormat::video(TrackFormat::MIME_AVC, 0, 720);
        assert_eq!(v.effective_resolution(), Resolution::new(1920, 720));

        let a = TrackFormat::audio(TrackFormat::MIME_AAC, 0, 0);
        assert_eq!(a.effective_sample_rate(), 44_100);
        assert_eq!(a.effective_channel_count(), 2);

        let a = TrackFormat::audio(TrackFormat::MIME_AAC, 48_000, 6);
        assert_eq!(a.effective_sample_rate(), 48_000);
        assert_eq!(a.effective_channel_count(), 6);
    }

    #[test]
    fn avc_annex_b_extra_data_is_split() {
        let extra = vec![
            0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e, // SPS
            0, 0, 0, 1, 0x68, 0xce, 0x38, 0x80, // PPS
        ];
        let v = TrackFormat::video(TrackFormat::MIME_AVC, 1280, 720).with_extra_data(extra);
        let init = v.initialization_data();
        assert_eq!(init.len(), 2);
        assert_eq!(&init[0][..], &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e]);
        assert_eq!(&init[1][..], &[0, 0, 0, 1, 0x68, 0xce, 0x38, 0x80]);
    }

    #[test]
    fn audio_extra_data_passes_through() {
        let a = TrackFormat::audio(TrackFormat::MIME_AAC, 44_100, 2).with_extra_data(vec![0x12, 0x10]);
        assert_eq!(a.initialization_data(), vec![Bytes::from_static(&[0x12, 0x10])]);
        assert!(a.is_aac());

        let empty = TrackFormat::audio(TrackFormat::MIME_AAC, 44_100, 2).with_extra_data(Vec::<u8>::new());
        assert!(empty.initialization_data().is_empty());
    }

    #[test]
    fn display_mentions_track_kind() {
        let v = TrackFormat::video(TrackFormat::MIME_AVC, 1280, 720);
        assert_eq!(v.to_string(), "video video/avc 1280x720 (extra_data=0 bytes)");
    }
}
