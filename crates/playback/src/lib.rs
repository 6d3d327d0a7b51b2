//! # Playback
//!
//! Turns an HLS playlist URL into per-track sample queues for a decoder.
//!
//! - [`DemuxAdapter`] wraps an external [`DemuxEngine`], discovers the tracks
//!   on the first segment and removes ADTS framing from AAC audio.
//! - [`TimelineNormalizer`] maps segment-local timestamps onto one strictly
//!   increasing session timeline per track.
//! - [`SampleQueue`] is the bounded hand-off between the pipeline worker and
//!   the [`PlaybackSink`]; a full queue blocks the worker.
//! - [`Pipeline`] drives download, demux, normalization and queueing.

pub mod config;
mod demux;
mod error;
mod pipeline;
pub mod queue;
mod sink;
mod state;
pub mod timeline;

pub use config::{PipelineConfig, QueueConfig, TimelineConfig};
pub use demux::{DemuxAdapter, DemuxEngine};
pub use error::{DemuxError, PipelineError};
pub use pipeline::Pipeline;
pub use queue::{BufferedPosition, OfferError, QueueState, ReadResult, SampleQueue};
pub use sink::{PlaybackSink, PreparedTrack, TrackRead, TrackReader};
pub use state::PipelineState;
pub use timeline::{NormalizedSegment, SegmentContext, TimelineNormalizer};

pub use hls_loader::LoaderConfig;
pub use media_types::{DemuxedSample, SampleFlags, TrackFormat, TrackType};
