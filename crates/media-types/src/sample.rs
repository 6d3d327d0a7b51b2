use bitflags::bitflags;
use bytes::Bytes;

use crate::TrackType;

bitflags! {
    /// Per-sample flags reported by the demuxer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SampleFlags: u32 {
        /// Sample is a sync point (IDR frame for video, every AAC frame for audio).
        const KEY_FRAME   = 1 << 0;
        /// Sample must be decoded but not rendered.
        const DECODE_ONLY = 1 << 31;
    }
}

/// One compressed access unit produced by the demuxer.
///
/// `time_us` is `None` when the demuxer could not assign a presentation
/// timestamp. Raw samples carry segment-local timestamps; after timeline
/// normalization every queued sample has `Some` session time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxedSample {
    pub track_type: TrackType,
    pub time_us: Option<i64>,
    pub flags: SampleFlags,
    pub data: Bytes,
}

impl DemuxedSample {
    pub fn new(
        track_type: TrackType,
        time_us: Option<i64>,
        flags: SampleFlags,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            track_type,
            time_us,
            flags,
            data: data.into(),
        }
    }

    #[inline]
    pub fn is_key_frame(&self) -> bool {
        self.flags.contains(SampleFlags::KEY_FRAME)
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        self.track_type == TrackType::Video
    }

    #[inline]
    pub fn is_audio(&self) -> bool {
        self.track_type == TrackType::Audio
    }

    /// Returns a copy of this sample with a new timestamp and payload.
    pub fn with_time_and_data(&self, time_us: i64, data: Bytes) -> Self {
        Self {
            track_type: self.track_type,
            time_us: Some(time_us),
            flags: self.flags,
            data,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_frame_flag() {
        let s = DemuxedSample::new(
            TrackType::Video,
            Some(0),
            SampleFlags::KEY_FRAME,
            vec![1, 2, 3],
        );
        assert!(s.is_key_frame());
        assert!(s.is_video());
        assert_eq!(s.size(), 3);

        let s = DemuxedSample::new(TrackType::Audio, None, SampleFlags::empty(), Bytes::new());
        assert!(!s.is_key_frame());
        assert!(s.is_audio());
    }

    #[test]
    fn with_time_keeps_flags() {
        let s = DemuxedSample::new(
            TrackType::Video,
            Some(10),
            SampleFlags::KEY_FRAME | SampleFlags::DECODE_ONLY,
            vec![9],
        );
        let moved = s.with_time_and_data(42, Bytes::from_static(&[7]));
        assert_eq!(moved.time_us, Some(42));
        assert_eq!(moved.flags, s.flags);
        assert_eq!(&moved.data[..], &[7]);
    }
}
