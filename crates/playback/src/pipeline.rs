use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hls_loader::{DownloadEvent, DownloadedSegment, SegmentDownloader};
use media_types::{DemuxedSample, TrackFormat, TrackType};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::demux::{DemuxAdapter, DemuxEngine};
use crate::queue::{BufferedPosition, QueueState, SampleQueue};
use crate::sink::{PlaybackSink, PreparedTrack};
use crate::timeline::{SegmentContext, TimelineNormalizer};
use crate::{PipelineConfig, PipelineError, PipelineState, QueueConfig};

type Queues = BTreeMap<TrackType, Arc<SampleQueue>>;

/// State visible to both the caller and the worker.
struct Shared {
    sink: Arc<dyn PlaybackSink>,
    queues: Mutex<Queues>,
    state: Mutex<PipelineState>,
    paused: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: PipelineState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!(from = %*current, to = %state, "Pipeline state changed");
            *current = state;
        }
    }

    fn queues(&self) -> Vec<Arc<SampleQueue>> {
        self.queues.lock().values().cloned().collect()
    }

    /// Stops producers and lets consumers read to the end.
    fn close_queues(&self) {
        for queue in self.queues() {
            queue.set_loading(false);
            queue.signal_end_of_stream();
        }
    }
}

struct WorkerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Plays one HLS stream at a time into a [`PlaybackSink`].
///
/// `play` starts a download whose segments are demuxed, normalized and
/// queued per track by a single blocking worker. The sink pulls samples
/// from the queues it receives in [`PlaybackSink::on_prepared`]. Full queues
/// block the worker, which in turn stops consuming download events.
pub struct Pipeline {
    config: PipelineConfig,
    downloader: SegmentDownloader,
    adapter: Arc<Mutex<DemuxAdapter>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl Pipeline {
    /// Creates a pipeline bound to the current Tokio runtime.
    pub fn new(
        config: PipelineConfig,
        engine: Box<dyn DemuxEngine>,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<Self, PipelineError> {
        let downloader = SegmentDownloader::new(config.loader.clone())?;
        let adapter = DemuxAdapter::new(engine, config.timeline.strip_adts);

        Ok(Self {
            config,
            downloader,
            adapter: Arc::new(Mutex::new(adapter)),
            shared: Arc::new(Shared {
                sink,
                queues: Mutex::new(Queues::new()),
                state: Mutex::new(PipelineState::Idle),
                paused: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Starts playing `url`, stopping the current session first.
    pub async fn play(&self, url: &str) {
        self.stop().await;

        info!(url, "Starting playback");
        self.adapter.lock().reset();
        self.shared.queues.lock().clear();
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.set_state(PipelineState::Preparing);
        self.shared.sink.on_play_when_ready(true);

        let events = self.downloader.download(url);
        let token = CancellationToken::new();
        let worker = Worker {
            shared: Arc::clone(&self.shared),
            normalizer: TimelineNormalizer::new(&self.config.timeline),
            queue_config: self.config.queue.clone(),
            token: token.clone(),
            queues: Queues::new(),
        };
        let adapter = Arc::clone(&self.adapter);
        let task = tokio::task::spawn_blocking(move || worker.run(&adapter, events));

        *self.worker.lock() = Some(WorkerHandle { token, task });
    }

    /// Cancels the download and the worker, then signals end of stream on
    /// every queue so the sink's read path finishes.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = &worker {
            worker.token.cancel();
        }
        self.downloader.cancel();
        self.shared.close_queues();

        if let Some(worker) = worker {
            if let Err(e) = worker.task.await {
                error!(error = %e, "Pipeline worker panicked");
            }
            // Tracks discovered while stopping got fresh queues.
            self.shared.close_queues();
            info!("Playback stopped");
        }
        self.shared.set_state(PipelineState::Idle);
    }

    /// Stops playback and releases the demux engine and the queues.
    pub async fn release(self) {
        self.stop().await;
        self.adapter.lock().release();
        let queues = std::mem::take(&mut *self.shared.queues.lock());
        for queue in queues.values() {
            queue.clear();
        }
        info!("Pipeline released");
    }

    pub fn pause(&self) {
        if !self.shared.paused.swap(true, Ordering::SeqCst) {
            debug!("Playback paused");
            self.shared.sink.on_play_when_ready(false);
        }
    }

    pub fn resume(&self) {
        if self.shared.paused.swap(false, Ordering::SeqCst) {
            debug!("Playback resumed");
            self.shared.sink.on_play_when_ready(true);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Current state. A draining session turns idle once the sink has
    /// consumed every queue.
    pub fn state(&self) -> PipelineState {
        let drained = self
            .shared
            .queues()
            .iter()
            .all(|q| q.state() == QueueState::Drained);

        let mut state = self.shared.state.lock();
        if *state == PipelineState::Draining && drained {
            debug!("All queues drained");
            *state = PipelineState::Idle;
        }
        *state
    }

    /// Smallest buffered position over the tracks that still have samples.
    pub fn buffered_position(&self) -> BufferedPosition {
        let queues = self.shared.queues();
        if queues.is_empty() {
            return BufferedPosition::Unset;
        }

        let mut position: Option<i64> = None;
        for queue in &queues {
            let track_position = match queue.buffered_position() {
                BufferedPosition::EndOfSource => continue,
                BufferedPosition::Unset => 0,
                BufferedPosition::At(time_us) => time_us,
            };
            position = Some(position.map_or(track_position, |p| p.min(track_position)));
        }
        position.map_or(BufferedPosition::EndOfSource, BufferedPosition::At)
    }

    /// Every track has a sample or the end-of-stream marker ready.
    pub fn is_ready(&self) -> bool {
        let queues = self.shared.queues();
        !queues.is_empty() && queues.iter().all(|q| q.is_ready())
    }

    pub fn queue(&self, track_type: TrackType) -> Option<Arc<SampleQueue>> {
        self.shared.queues.lock().get(&track_type).cloned()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.token.cancel();
        }
        self.shared.close_queues();
    }
}

/// Download-to-queue chain of one session. Runs on a blocking thread and is
/// the only producer for the session's queues.
struct Worker {
    shared: Arc<Shared>,
    normalizer: TimelineNormalizer,
    queue_config: QueueConfig,
    token: CancellationToken,
    queues: Queues,
}

impl Worker {
    fn run(mut self, adapter: &Mutex<DemuxAdapter>, mut events: mpsc::Receiver<DownloadEvent>) {
        let mut adapter = adapter.lock();

        while let Some(event) = events.blocking_recv() {
            if self.token.is_cancelled() {
                break;
            }

            match event {
                DownloadEvent::Started {
                    playlist,
                    total_segments,
                } => {
                    let duration_us = playlist.total_duration_us();
                    debug!(segments = total_segments, duration_us, "Download started");
                    self.shared.sink.on_duration(duration_us);
                }
                DownloadEvent::SegmentDownloaded { segment, .. } => {
                    if let Err(e) = self.process_segment(&mut adapter, segment) {
                        if !e.is_cancelled() {
                            self.fail(e);
                        }
                        break;
                    }
                }
                DownloadEvent::Progress { fraction, .. } => {
                    self.shared.sink.on_progress(fraction);
                }
                DownloadEvent::Completed {
                    segment_count,
                    total_bytes,
                    elapsed,
                    ..
                } => {
                    info!(
                        segments = segment_count,
                        total_bytes,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "All segments queued"
                    );
                    self.finish();
                    break;
                }
                DownloadEvent::Failed { error, segment } => {
                    if let Some(segment) = &segment {
                        warn!(url = %segment.url, "Download failed on segment");
                    }
                    self.fail(PipelineError::Download(error));
                    break;
                }
                DownloadEvent::Cancelled => {
                    debug!("Download cancelled");
                    break;
                }
            }
        }
    }

    fn process_segment(
        &mut self,
        adapter: &mut DemuxAdapter,
        segment: DownloadedSegment,
    ) -> Result<(), PipelineError> {
        let index = segment.index;

        if !adapter.has_tracks() {
            let tracks = adapter
                .probe(&segment.data)
                .map_err(|e| PipelineError::track_discovery(index, &e))?
                .to_vec();
            self.normalizer
                .set_audio_frame_duration(adapter.audio_frame_duration_us());
            self.prepare(tracks);
        }

        let raw = match adapter.demux(&segment.data) {
            Ok(raw) => raw,
            Err(e) => {
                let error = PipelineError::demux(index, &e);
                warn!(index, error = %error, "Skipping segment");
                self.shared.sink.on_segment_error(index, &error);
                return Ok(());
            }
        };

        let context =
            SegmentContext::new(index).with_discontinuity(segment.segment.discontinuity);
        let normalized = self.normalizer.normalize(raw, &context);
        self.enqueue(normalized.samples)
    }

    fn prepare(&mut self, tracks: Vec<TrackFormat>) {
        let prepared: Vec<PreparedTrack> = tracks
            .into_iter()
            .map(|format| {
                let queue = SampleQueue::new(
                    format.track_type,
                    self.queue_config.capacity_for(format.track_type),
                    self.queue_config.backpressure_interval,
                );
                PreparedTrack {
                    format,
                    queue: Arc::new(queue),
                }
            })
            .collect();

        self.queues = prepared
            .iter()
            .map(|t| (t.track_type(), Arc::clone(&t.queue)))
            .collect();
        *self.shared.queues.lock() = self.queues.clone();
        self.shared.set_state(PipelineState::Loading);

        info!(tracks = prepared.len(), "Tracks prepared");
        self.shared.sink.on_prepared(&prepared);
    }

    /// Queues samples in order, waiting while a queue is full.
    fn enqueue(&self, samples: Vec<DemuxedSample>) -> Result<(), PipelineError> {
        for sample in samples {
            let Some(queue) = self.queues.get(&sample.track_type) else {
                continue;
            };
            if let Err(e) = queue.offer_blocking(sample, &self.token) {
                debug!(reason = %e, "Stopped queueing samples");
                return Err(PipelineError::Cancelled);
            }
        }
        Ok(())
    }

    fn finish(&self) {
        for queue in self.queues.values() {
            queue.signal_end_of_stream();
            queue.set_loading(false);
        }
        self.shared.set_state(PipelineState::Draining);
    }

    fn fail(&self, error: PipelineError) {
        error!(error = %error, "Playback failed");
        self.shared.sink.on_error(&error);
        for queue in self.queues.values() {
            queue.set_loading(false);
            queue.signal_end_of_stream();
        }
        self.shared.set_state(PipelineState::Idle);
    }
}
