use bytes::Bytes;

use crate::playlist::Segment;

/// A segment together with its downloaded payload.
#[derive(Debug, Clone)]
pub struct DownloadedSegment {
    pub segment: Segment,
    /// Zero-based position of the segment in the media playlist.
    pub index: usize,
    pub data: Bytes,
}

impl DownloadedSegment {
    pub fn new(segment: Segment, index: usize, data: Bytes) -> Self {
        Self {
            segment,
            index,
            data,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
