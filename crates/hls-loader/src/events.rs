use std::sync::Arc;
use std::time::Duration;

use hls::{DownloadedSegment, MediaPlaylist, Segment};

use crate::LoaderError;

/// Progress of one download session, in emission order.
///
/// A session that reaches `Started` emits one `SegmentDownloaded` and one
/// `Progress` per segment, then exactly one of `Completed`, `Failed` or
/// `Cancelled`. Sessions that fail before `Started` only emit the terminal
/// event. A cancelled session whose receiver stops draining may close the
/// channel without `Cancelled`.
#[derive(Debug)]
pub enum DownloadEvent {
    Started {
        playlist: Arc<MediaPlaylist>,
        total_segments: usize,
    },
    SegmentDownloaded {
        segment: DownloadedSegment,
        total: usize,
    },
    Progress {
        /// `downloaded / total`, reaching `1.0` after the last segment.
        fraction: f32,
        downloaded: usize,
        total: usize,
    },
    Completed {
        /// Downloaded segments, only filled when `retain_segments` is enabled.
        segments: Vec<DownloadedSegment>,
        segment_count: usize,
        total_bytes: u64,
        elapsed: Duration,
    },
    Failed {
        error: LoaderError,
        /// The segment being fetched, when the failure happened on one.
        segment: Option<Segment>,
    },
    Cancelled,
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadEvent::Completed { .. } | DownloadEvent::Failed { .. } | DownloadEvent::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DownloadEvent::Started { .. } => "started",
            DownloadEvent::SegmentDownloaded { .. } => "segment_downloaded",
            DownloadEvent::Progress { .. } => "progress",
            DownloadEvent::Completed { .. } => "completed",
            DownloadEvent::Failed { .. } => "failed",
            DownloadEvent::Cancelled => "cancelled",
        }
    }
}
