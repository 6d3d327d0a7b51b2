//! Session timeline normalization.
//!
//! Demuxers report timestamps relative to the segment's own clock, which may
//! restart at zero, jump backwards or be missing. The normalizer maps them
//! onto one session timeline that increases strictly per track:
//!
//! | track | policy |
//! |-------|--------|
//! | video | rebase to the segment start (plus the A/V offset when it is in range), then clamp to `last + min_sample_spacing` |
//! | audio | rebase like video when present and increasing, otherwise `last + frame_duration` |
//!
//! The next segment starts one guard interval after the last video sample
//! (or at the predicted next audio time for audio-only streams).

use media_types::{DemuxedSample, TrackType};
use tracing::{debug, trace, warn};

use crate::TimelineConfig;

/// Number of rebased samples per track and segment that are traced.
const TRACED_SAMPLES: usize = 3;

/// Position of a segment within the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentContext {
    pub index: usize,
    /// The playlist marked a discontinuity before this segment.
    pub discontinuity: bool,
}

impl SegmentContext {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            discontinuity: false,
        }
    }

    pub fn with_discontinuity(mut self, discontinuity: bool) -> Self {
        self.discontinuity = discontinuity;
        self
    }
}

/// Samples of one segment on the session timeline, in demux order.
#[derive(Debug, Default)]
pub struct NormalizedSegment {
    pub samples: Vec<DemuxedSample>,
    /// Samples without a usable timestamp that were discarded.
    pub dropped: usize,
    /// Offset added to video timestamps; zero when absent or out of range.
    pub av_offset_us: i64,
    /// Session time the segment was rebased onto.
    pub segment_start_us: i64,
}

impl NormalizedSegment {
    pub fn count(&self, track_type: TrackType) -> usize {
        self.samples
            .iter()
            .filter(|s| s.track_type == track_type)
            .count()
    }
}

#[derive(Debug)]
pub struct TimelineNormalizer {
    max_av_offset_us: i64,
    min_spacing_us: i64,
    guard_us: i64,
    audio_frame_duration_us: i64,
    segment_start_us: i64,
    last_video_us: Option<i64>,
    last_audio_us: Option<i64>,
    next_audio_us: Option<i64>,
}

impl TimelineNormalizer {
    pub fn new(config: &TimelineConfig) -> Self {
        let min_spacing_us = config.min_sample_spacing_us();
        Self {
            max_av_offset_us: config.max_av_offset_us(),
            min_spacing_us,
            guard_us: config.segment_guard_us(),
            audio_frame_duration_us: min_spacing_us,
            segment_start_us: 0,
            last_video_us: None,
            last_audio_us: None,
            next_audio_us: None,
        }
    }

    /// Sets the duration used to extrapolate audio timestamps. `None` falls
    /// back to the minimum sample spacing.
    pub fn set_audio_frame_duration(&mut self, duration_us: Option<i64>) {
        self.audio_frame_duration_us = duration_us
            .filter(|d| *d > 0)
            .unwrap_or(self.min_spacing_us);
    }

    pub fn audio_frame_duration_us(&self) -> i64 {
        self.audio_frame_duration_us
    }

    /// Session time the next segment will be rebased onto.
    pub fn segment_start_us(&self) -> i64 {
        self.segment_start_us
    }

    pub fn last_emitted_us(&self, track_type: TrackType) -> Option<i64> {
        match track_type {
            TrackType::Video => self.last_video_us,
            TrackType::Audio => self.last_audio_us,
        }
    }

    /// Returns to the start of a new session. The frame duration is kept.
    pub fn reset(&mut self) {
        self.segment_start_us = 0;
        self.last_video_us = None;
        self.last_audio_us = None;
        self.next_audio_us = None;
    }

    /// Maps one segment's samples onto the session timeline.
    pub fn normalize(
        &mut self,
        raw: Vec<DemuxedSample>,
        context: &SegmentContext,
    ) -> NormalizedSegment {
        let base_us = self.segment_start_us;
        let min_video = min_time(&raw, TrackType::Video);
        let min_audio = min_time(&raw, TrackType::Audio);
        let av_offset_us = self.av_offset(min_video, min_audio, context.index);

        if context.discontinuity {
            debug!(
                index = context.index,
                segment_start_us = base_us,
                "Discontinuity, rebasing onto session timeline"
            );
        }

        let mut samples = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        let mut traced_video = 0usize;
        let mut traced_audio = 0usize;
        let mut emitted_video = false;
        let mut emitted_audio = false;

        for sample in raw {
            let time_us = match sample.track_type {
                TrackType::Video => sample
                    .time_us
                    .zip(min_video)
                    .map(|(pts, min)| self.next_video_time(base_us + av_offset_us + (pts - min))),
                TrackType::Audio => {
                    let rebased = sample.time_us.zip(min_audio).map(|(pts, min)| base_us + (pts - min));
                    Some(self.next_audio_time(rebased, base_us))
                }
            };

            let Some(time_us) = time_us else {
                dropped += 1;
                continue;
            };

            let traced = match sample.track_type {
                TrackType::Video => {
                    emitted_video = true;
                    &mut traced_video
                }
                TrackType::Audio => {
                    emitted_audio = true;
                    &mut traced_audio
                }
            };
            if *traced < TRACED_SAMPLES {
                trace!(
                    index = context.index,
                    track = %sample.track_type,
                    raw_us = ?sample.time_us,
                    time_us,
                    "Rebased sample"
                );
                *traced += 1;
            }

            samples.push(DemuxedSample {
                time_us: Some(time_us),
                ..sample
            });
        }

        if emitted_video {
            if let Some(last) = self.last_video_us {
                self.segment_start_us = last + self.guard_us;
            }
        } else if emitted_audio {
            if let Some(next) = self.next_audio_us {
                self.segment_start_us = next;
            }
        }

        if dropped > 0 {
            warn!(index = context.index, dropped, "Dropped samples without timestamp");
        }
        debug!(
            index = context.index,
            samples = samples.len(),
            av_offset_us,
            next_segment_start_us = self.segment_start_us,
            "Normalized segment"
        );

        NormalizedSegment {
            samples,
            dropped,
            av_offset_us,
            segment_start_us: base_us,
        }
    }

    fn av_offset(&self, min_video: Option<i64>, min_audio: Option<i64>, index: usize) -> i64 {
        let (Some(video), Some(audio)) = (min_video, min_audio) else {
            return 0;
        };
        let offset = video - audio;
        if offset.abs() <= self.max_av_offset_us {
            offset
        } else {
            warn!(index, offset_us = offset, "Ignoring out-of-range A/V offset");
            0
        }
    }

    fn next_video_time(&mut self, candidate: i64) -> i64 {
        let candidate = candidate.max(0);
        let time_us = match self.last_video_us {
            Some(last) if candidate <= last => last + self.min_spacing_us,
            _ => candidate,
        };
        self.last_video_us = Some(time_us);
        time_us
    }

    fn next_audio_time(&mut self, rebased: Option<i64>, base_us: i64) -> i64 {
        let time_us = match rebased.map(|t| t.max(0)) {
            Some(candidate) if self.last_audio_us.is_none_or(|last| candidate > last) => candidate,
            _ => self.next_audio_us.unwrap_or(base_us),
        };
        self.last_audio_us = Some(time_us);
        self.next_audio_us = Some(time_us + self.audio_frame_duration_us);
        time_us
    }
}

fn min_time(samples: &[DemuxedSample], track_type: TrackType) -> Option<i64> {
    samples
        .iter()
        .filter(|s| s.track_type == track_type)
        .filter_map(|s| s.time_us)
        .min()
}
