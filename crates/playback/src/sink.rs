use std::sync::Arc;

use media_types::{DemuxedSample, TrackFormat, TrackType};

use crate::PipelineError;
use crate::queue::{ReadResult, SampleQueue};

/// Consumer side of the pipeline, typically a decoder/renderer.
///
/// Callbacks run on the pipeline worker thread and must not block for long.
/// Samples are pulled from the queues handed over in [`on_prepared`].
///
/// [`on_prepared`]: PlaybackSink::on_prepared
pub trait PlaybackSink: Send + Sync {
    /// Tracks were discovered. Called once per session, before any sample
    /// is queued.
    fn on_prepared(&self, tracks: &[PreparedTrack]);

    /// Total playlist duration in microseconds.
    fn on_duration(&self, _duration_us: i64) {}

    fn on_progress(&self, _fraction: f32) {}

    /// A segment could not be demuxed and was skipped.
    fn on_segment_error(&self, _index: usize, _error: &PipelineError) {}

    /// The session ended with an error.
    fn on_error(&self, _error: &PipelineError) {}

    /// Playback should run (`true`) or hold (`false`).
    fn on_play_when_ready(&self, _play_when_ready: bool) {}
}

/// A discovered track and the queue its samples are delivered on.
#[derive(Debug, Clone)]
pub struct PreparedTrack {
    pub format: TrackFormat,
    pub queue: Arc<SampleQueue>,
}

impl PreparedTrack {
    pub fn track_type(&self) -> TrackType {
        self.format.track_type
    }

    pub fn reader(&self) -> TrackReader {
        TrackReader::new(self.format.clone(), Arc::clone(&self.queue))
    }
}

/// Outcome of [`TrackReader::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRead {
    Format(TrackFormat),
    Sample(DemuxedSample),
    NothingRead,
    EndOfStream,
}

/// Pull interface over one track: the format first, then its samples.
#[derive(Debug)]
pub struct TrackReader {
    format: TrackFormat,
    queue: Arc<SampleQueue>,
    format_sent: bool,
}

impl TrackReader {
    pub fn new(format: TrackFormat, queue: Arc<SampleQueue>) -> Self {
        Self {
            format,
            queue,
            format_sent: false,
        }
    }

    pub fn format(&self) -> &TrackFormat {
        &self.format
    }

    pub fn is_ready(&self) -> bool {
        self.queue.is_ready()
    }

    /// Returns the format on the first call and whenever `require_format` is
    /// set; otherwise reads the next sample (leaving it queued with `peek`).
    pub fn read(&mut self, require_format: bool, peek: bool) -> TrackRead {
        if !self.format_sent || require_format {
            self.format_sent = true;
            return TrackRead::Format(self.format.clone());
        }

        match self.queue.read(peek) {
            ReadResult::Sample(sample) => TrackRead::Sample(sample),
            ReadResult::NothingRead => TrackRead::NothingRead,
            ReadResult::EndOfStream => TrackRead::EndOfStream,
        }
    }

    /// Drops samples before `position_us`. Returns how many were dropped.
    pub fn skip(&self, position_us: i64) -> usize {
        self.queue.skip_to_position(position_us, false)
    }
}
