use std::time::Duration;

use hls_loader::LoaderConfig;
use media_types::TrackType;

/// Default video queue capacity, roughly 30 seconds at 30 fps.
pub const DEFAULT_VIDEO_CAPACITY: usize = 1000;
/// Default audio queue capacity, roughly 30 seconds of AAC frames.
pub const DEFAULT_AUDIO_CAPACITY: usize = 1500;

/// Sample queue sizing and backpressure behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of queued video samples
    pub video_capacity: usize,

    /// Maximum number of queued audio samples
    pub audio_capacity: usize,

    /// Upper bound on how long a blocked producer sleeps before re-checking
    /// cancellation
    pub backpressure_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            video_capacity: DEFAULT_VIDEO_CAPACITY,
            audio_capacity: DEFAULT_AUDIO_CAPACITY,
            backpressure_interval: Duration::from_millis(10),
        }
    }
}

impl QueueConfig {
    pub fn capacity_for(&self, track_type: TrackType) -> usize {
        match track_type {
            TrackType::Video => self.video_capacity,
            TrackType::Audio => self.audio_capacity,
        }
    }

    pub fn with_capacities(mut self, video: usize, audio: usize) -> Self {
        self.video_capacity = video;
        self.audio_capacity = audio;
        self
    }

    pub fn with_backpressure_interval(mut self, interval: Duration) -> Self {
        self.backpressure_interval = interval;
        self
    }
}

/// Timestamp normalization parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineConfig {
    /// Largest audio/video start offset that is still applied to video.
    /// Larger offsets are treated as broken and ignored.
    pub max_av_offset: Duration,

    /// Spacing forced between a clamped video sample and its predecessor
    pub min_sample_spacing: Duration,

    /// Gap inserted between the last video sample of a segment and the
    /// start of the next one
    pub segment_guard: Duration,

    /// Remove ADTS headers from AAC access units
    pub strip_adts: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_av_offset: Duration::from_millis(500),
            min_sample_spacing: Duration::from_millis(1),
            segment_guard: Duration::from_millis(1),
            strip_adts: true,
        }
    }
}

impl TimelineConfig {
    pub fn with_max_av_offset(mut self, offset: Duration) -> Self {
        self.max_av_offset = offset;
        self
    }

    pub fn with_strip_adts(mut self, strip: bool) -> Self {
        self.strip_adts = strip;
        self
    }

    pub(crate) fn max_av_offset_us(&self) -> i64 {
        duration_us(self.max_av_offset)
    }

    pub(crate) fn min_sample_spacing_us(&self) -> i64 {
        duration_us(self.min_sample_spacing).max(1)
    }

    pub(crate) fn segment_guard_us(&self) -> i64 {
        duration_us(self.segment_guard)
    }
}

fn duration_us(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub loader: LoaderConfig,
    pub queue: QueueConfig,
    pub timeline: TimelineConfig,
}

impl PipelineConfig {
    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_timeline(mut self, timeline: TimelineConfig) -> Self {
        self.timeline = timeline;
        self
    }
}
