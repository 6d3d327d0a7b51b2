//! Bounded per-track sample queue.
//!
//! One producer (the pipeline worker) and one consumer (the playback sink)
//! share a queue. Capacity is counted in samples. A producer that finds the
//! queue full parks on a condition variable until the consumer frees a slot,
//! waking at least every `backpressure_interval` to observe cancellation.

use std::collections::VecDeque;
use std::time::Duration;

use media_types::{DemuxedSample, TrackType};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Outcome of [`SampleQueue::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Sample(DemuxedSample),
    /// The queue is empty but more samples may still arrive.
    NothingRead,
    /// The queue is empty and end of stream has been signaled.
    EndOfStream,
}

/// Timestamp of the newest buffered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferedPosition {
    /// Nothing has been queued yet.
    Unset,
    At(i64),
    /// End of stream was signaled and every sample has been consumed.
    EndOfSource,
}

/// Lifecycle of a queue. `Drained` is terminal until [`SampleQueue::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Open,
    EndOfStreamSignaled,
    Drained,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OfferError {
    #[error("offer cancelled")]
    Cancelled,

    #[error("queue is no longer loading")]
    NotLoading,

    #[error("end of stream already signaled")]
    EndOfStream,

    #[error("{actual} sample offered to {expected} queue")]
    TrackMismatch {
        expected: TrackType,
        actual: TrackType,
    },
}

#[derive(Debug)]
struct Inner {
    samples: VecDeque<DemuxedSample>,
    end_of_stream: bool,
    loading: bool,
    last_time_us: Option<i64>,
}

#[derive(Debug)]
pub struct SampleQueue {
    track_type: TrackType,
    capacity: usize,
    wake_interval: Duration,
    inner: Mutex<Inner>,
    space_available: Condvar,
}

impl SampleQueue {
    pub fn new(track_type: TrackType, capacity: usize, wake_interval: Duration) -> Self {
        Self {
            track_type,
            capacity: capacity.max(1),
            wake_interval,
            inner: Mutex::new(Inner {
                samples: VecDeque::with_capacity(capacity.min(256)),
                end_of_stream: false,
                loading: true,
                last_time_us: None,
            }),
            space_available: Condvar::new(),
        }
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `sample` unless the queue is full or end of stream was
    /// signaled. Returns `false` when the sample was rejected.
    pub fn offer(&self, sample: DemuxedSample) -> bool {
        if sample.track_type != self.track_type {
            return false;
        }
        let mut inner = self.inner.lock();
        if inner.end_of_stream || inner.samples.len() >= self.capacity {
            return false;
        }
        Self::push(&mut inner, sample);
        true
    }

    /// Appends `sample`, waiting for space while the queue is full.
    ///
    /// Never drops the sample on a full queue. Returns an error only when the
    /// token is cancelled, loading was switched off, or end of stream was
    /// signaled while waiting.
    pub fn offer_blocking(
        &self,
        sample: DemuxedSample,
        token: &CancellationToken,
    ) -> Result<(), OfferError> {
        if sample.track_type != self.track_type {
            return Err(OfferError::TrackMismatch {
                expected: self.track_type,
                actual: sample.track_type,
            });
        }

        let mut inner = self.inner.lock();
        let mut waited = false;
        loop {
            if token.is_cancelled() {
                return Err(OfferError::Cancelled);
            }
            if !inner.loading {
                return Err(OfferError::NotLoading);
            }
            if inner.end_of_stream {
                return Err(OfferError::EndOfStream);
            }
            if inner.samples.len() < self.capacity {
                if waited {
                    trace!(track = %self.track_type, "Queue has space again");
                }
                Self::push(&mut inner, sample);
                return Ok(());
            }
            waited = true;
            self.space_available.wait_for(&mut inner, self.wake_interval);
        }
    }

    fn push(inner: &mut Inner, sample: DemuxedSample) {
        if let Some(time_us) = sample.time_us {
            inner.last_time_us = Some(time_us);
        }
        inner.samples.push_back(sample);
    }

    /// Removes and returns the oldest sample.
    pub fn poll(&self) -> Option<DemuxedSample> {
        let sample = self.inner.lock().samples.pop_front();
        if sample.is_some() {
            self.space_available.notify_one();
        }
        sample
    }

    /// Returns the oldest sample without removing it.
    pub fn peek(&self) -> Option<DemuxedSample> {
        self.inner.lock().samples.front().cloned()
    }

    /// Reads the oldest sample. With `peek` set the sample stays queued.
    pub fn read(&self, peek: bool) -> ReadResult {
        let mut inner = self.inner.lock();
        let sample = if peek {
            inner.samples.front().cloned()
        } else {
            inner.samples.pop_front()
        };

        match sample {
            Some(sample) => {
                if !peek {
                    self.space_available.notify_one();
                }
                ReadResult::Sample(sample)
            }
            None if inner.end_of_stream => ReadResult::EndOfStream,
            None => ReadResult::NothingRead,
        }
    }

    pub fn has_capacity(&self, count: usize) -> bool {
        self.inner.lock().samples.len() + count <= self.capacity
    }

    pub fn signal_end_of_stream(&self) {
        self.inner.lock().end_of_stream = true;
        self.space_available.notify_all();
    }

    /// Discards queued samples timestamped strictly before `position_us`.
    ///
    /// With `keyframe_only` set, discarding stops at the first keyframe so
    /// the decoder can resume from it. Returns the number of dropped samples.
    pub fn skip_to_position(&self, position_us: i64, keyframe_only: bool) -> usize {
        let mut inner = self.inner.lock();
        let mut skipped = 0;
        while let Some(front) = inner.samples.front() {
            if front.time_us.is_some_and(|t| t >= position_us) {
                break;
            }
            if keyframe_only && front.is_key_frame() {
                break;
            }
            inner.samples.pop_front();
            skipped += 1;
        }
        drop(inner);

        if skipped > 0 {
            self.space_available.notify_all();
        }
        skipped
    }

    pub fn buffered_position(&self) -> BufferedPosition {
        let inner = self.inner.lock();
        if inner.end_of_stream && inner.samples.is_empty() {
            return BufferedPosition::EndOfSource;
        }
        inner
            .last_time_us
            .map_or(BufferedPosition::Unset, BufferedPosition::At)
    }

    /// A sample or the end-of-stream marker can be read without waiting.
    pub fn is_ready(&self) -> bool {
        let inner = self.inner.lock();
        !inner.samples.is_empty() || inner.end_of_stream
    }

    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }

    pub fn state(&self) -> QueueState {
        let inner = self.inner.lock();
        match (inner.end_of_stream, inner.samples.is_empty()) {
            (false, _) => QueueState::Open,
            (true, false) => QueueState::EndOfStreamSignaled,
            (true, true) => QueueState::Drained,
        }
    }

    /// Switching loading off makes blocked and future `offer_blocking` calls
    /// return [`OfferError::NotLoading`].
    pub fn set_loading(&self, loading: bool) {
        self.inner.lock().loading = loading;
        self.space_available.notify_all();
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    /// Empties the queue and returns it to the open, loading state.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.samples.clear();
        inner.end_of_stream = false;
        inner.loading = true;
        inner.last_time_us = None;
        drop(inner);
        self.space_available.notify_all();
    }
}
