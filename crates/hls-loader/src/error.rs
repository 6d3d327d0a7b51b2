use hls::{PlaylistError, Segment};
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("download cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("failed to parse playlist {url}: {source}")]
    Playlist {
        url: String,
        #[source]
        source: PlaylistError,
    },

    #[error("master playlist {url} has no usable variant")]
    NoMediaPlaylist { url: String },

    #[error("media playlist {url} has no segments")]
    NoSegments { url: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("segment {sequence} ({url}) failed: {source}")]
    SegmentFetch {
        sequence: u64,
        url: String,
        #[source]
        source: Box<LoaderError>,
    },

    #[error("downloader needs a Tokio runtime: {reason}")]
    Runtime { reason: String },
}

impl LoaderError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn playlist(url: impl Into<String>, source: PlaylistError) -> Self {
        Self::Playlist {
            url: url.into(),
            source,
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Wraps a transport failure with the segment it happened on.
    /// Cancellation is passed through unchanged.
    pub fn segment_fetch(segment: &Segment, source: LoaderError) -> Self {
        if source.is_cancelled() {
            return source;
        }
        Self::SegmentFetch {
            sequence: segment.sequence_number,
            url: segment.url.clone(),
            source: Box::new(source),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
