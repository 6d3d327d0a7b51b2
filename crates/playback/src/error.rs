use hls_loader::LoaderError;
use thiserror::Error;

/// Failure reported by a [`DemuxEngine`](crate::DemuxEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemuxError {
    #[error("invalid container data: {0}")]
    InvalidData(String),

    #[error("no audio or video track found")]
    NoTracks,

    #[error("unsupported codec: {0}")]
    Unsupported(String),

    #[error("demux engine has been released")]
    Released,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Download(#[from] LoaderError),

    /// The first segment could not be probed; playback cannot start.
    #[error("track discovery failed on segment {index}: {reason}")]
    TrackDiscovery { index: usize, reason: String },

    /// One segment could not be demuxed. Playback continues with the next.
    #[error("demux failed on segment {index}: {reason}")]
    Demux { index: usize, reason: String },

    #[error("pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn track_discovery(index: usize, source: &DemuxError) -> Self {
        Self::TrackDiscovery {
            index,
            reason: source.to_string(),
        }
    }

    pub fn demux(index: usize, source: &DemuxError) -> Self {
        Self::Demux {
            index,
            reason: source.to_string(),
        }
    }

    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Demux { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Download(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
