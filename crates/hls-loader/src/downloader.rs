use std::sync::Arc;
use std::time::{Duration, Instant};

use hls::{DownloadedSegment, MediaPlaylist, Playlist, Segment};
use parking_lot::Mutex;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::create_client;
use crate::fetcher::{fetch_playlist, fetch_segment};
use crate::{DownloadEvent, LoaderConfig, LoaderError};

/// How long a cancelled session waits for room in a full event channel
/// before giving up on delivering `Cancelled`.
const CANCELLED_SEND_GRACE: Duration = Duration::from_secs(1);

struct ActiveDownload {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Downloads one HLS stream at a time.
///
/// Starting a new download cancels the previous one. The HTTP client is
/// shared by all sessions of this instance.
pub struct SegmentDownloader {
    client: Client,
    config: Arc<LoaderConfig>,
    runtime: Handle,
    active: Mutex<Option<ActiveDownload>>,
}

impl SegmentDownloader {
    /// Creates a downloader bound to the current Tokio runtime.
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        let runtime = Handle::try_current().map_err(|e| LoaderError::Runtime {
            reason: e.to_string(),
        })?;
        Self::with_runtime(config, runtime)
    }

    /// Creates a downloader that spawns its sessions on `runtime`.
    pub fn with_runtime(config: LoaderConfig, runtime: Handle) -> Result<Self, LoaderError> {
        let client = create_client(&config)?;
        Ok(Self {
            client,
            config: Arc::new(config),
            runtime,
            active: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Starts downloading the stream at `url`, replacing any active session.
    ///
    /// The returned receiver yields the session's events; the previous
    /// session's receiver observes `Cancelled`.
    pub fn download(&self, url: &str) -> mpsc::Receiver<DownloadEvent> {
        let (events, receiver) = mpsc::channel(self.config.event_channel_capacity.max(1));
        let token = CancellationToken::new();

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            debug!("Replacing active download");
            previous.token.cancel();
        }

        let session = DownloadSession {
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            url: url.to_string(),
            token: token.clone(),
            events,
        };
        let task = self.runtime.spawn(session.run());
        *active = Some(ActiveDownload { token, task });

        receiver
    }

    /// Fetches and parses a playlist without downloading segments.
    pub async fn fetch_playlist(&self, url: &str) -> Result<Playlist, LoaderError> {
        fetch_playlist(
            &self.client,
            url,
            &self.config.parse_options,
            &CancellationToken::new(),
        )
        .await
    }

    /// Cancels the active session, if any. Safe to call repeatedly and from
    /// any thread.
    pub fn cancel(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            active.token.cancel();
        }
    }

    /// Returns `true` while a session task is still running.
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Cancels the active session, waits for its task to exit and drops the
    /// HTTP client.
    pub async fn release(self) {
        let active = self.active.lock().take();
        if let Some(active) = active {
            active.token.cancel();
            if let Err(e) = active.task.await {
                error!(error = %e, "Download task panicked");
            }
        }
        debug!("Downloader released");
    }
}

impl Drop for SegmentDownloader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A failure together with the segment it happened on.
struct Failure {
    error: LoaderError,
    segment: Option<Segment>,
}

impl From<LoaderError> for Failure {
    fn from(error: LoaderError) -> Self {
        Self {
            error,
            segment: None,
        }
    }
}

struct DownloadSession {
    client: Client,
    config: Arc<LoaderConfig>,
    url: String,
    token: CancellationToken,
    events: mpsc::Sender<DownloadEvent>,
}

impl DownloadSession {
    async fn run(self) {
        let terminal = match self.execute().await {
            Ok(completed) => completed,
            Err(_) if self.token.is_cancelled() => DownloadEvent::Cancelled,
            Err(Failure {
                error: LoaderError::Cancelled,
                ..
            }) => DownloadEvent::Cancelled,
            Err(Failure { error, segment }) => {
                warn!(url = %self.url, error = %error, "Download failed");
                DownloadEvent::Failed { error, segment }
            }
        };

        self.deliver(terminal).await;
    }

    /// Sends the terminal event. A slow receiver still gets `Completed` or
    /// `Failed` unless the session is cancelled meanwhile; `Cancelled` only
    /// waits [`CANCELLED_SEND_GRACE`] for channel space.
    async fn deliver(&self, terminal: DownloadEvent) {
        if !matches!(terminal, DownloadEvent::Cancelled) {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {}
                permit = self.events.reserve() => {
                    if let Ok(permit) = permit {
                        permit.send(terminal);
                    }
                    return;
                }
            }
        }

        info!(url = %self.url, "Download cancelled");
        match tokio::time::timeout(CANCELLED_SEND_GRACE, self.events.send(DownloadEvent::Cancelled))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!(url = %self.url, "Event receiver already dropped"),
            Err(_) => warn!(url = %self.url, "Event receiver is not draining, dropping Cancelled"),
        }
    }

    async fn execute(&self) -> Result<DownloadEvent, Failure> {
        let started_at = Instant::now();
        let media = Arc::new(self.resolve_media_playlist().await?);
        let total = media.segment_count();

        info!(
            url = %self.url,
            segments = total,
            duration = media.total_duration(),
            "Download started"
        );
        self.emit(DownloadEvent::Started {
            playlist: Arc::clone(&media),
            total_segments: total,
        })
        .await?;

        let mut total_bytes = 0u64;
        let mut retained = Vec::new();

        for (index, segment) in media.segments.iter().enumerate() {
            let data = fetch_segment(&self.client, segment, &self.token)
                .await
                .map_err(|e| Failure {
                    error: LoaderError::segment_fetch(segment, e),
                    segment: Some(segment.clone()),
                })?;

            total_bytes += data.len() as u64;
            debug!(
                index,
                sequence = segment.sequence_number,
                bytes = data.len(),
                "Segment downloaded"
            );

            let downloaded = DownloadedSegment::new(segment.clone(), index, data);
            if self.config.retain_segments {
                retained.push(downloaded.clone());
            }

            self.emit(DownloadEvent::SegmentDownloaded {
                segment: downloaded,
                total,
            })
            .await?;
            self.emit(DownloadEvent::Progress {
                fraction: (index + 1) as f32 / total as f32,
                downloaded: index + 1,
                total,
            })
            .await?;
        }

        let elapsed = started_at.elapsed();
        info!(
            url = %self.url,
            segments = total,
            total_bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "Download completed"
        );

        Ok(DownloadEvent::Completed {
            segments: retained,
            segment_count: total,
            total_bytes,
            elapsed,
        })
    }

    /// Fetches the playlist at the session URL, following a master playlist
    /// to its highest-bandwidth variant.
    async fn resolve_media_playlist(&self) -> Result<MediaPlaylist, Failure> {
        let options = &self.config.parse_options;
        let media = match fetch_playlist(&self.client, &self.url, options, &self.token).await? {
            Playlist::Media(media) => media,
            Playlist::Master(master) => {
                let variant = master.select_variant().ok_or_else(|| {
                    LoaderError::NoMediaPlaylist {
                        url: self.url.clone(),
                    }
                })?;
                info!(
                    variant = %variant.url,
                    bandwidth = variant.bandwidth,
                    resolution = ?variant.resolution,
                    "Selected variant"
                );

                match fetch_playlist(&self.client, &variant.url, options, &self.token).await? {
                    Playlist::Media(media) => media,
                    Playlist::Master(_) => {
                        return Err(LoaderError::NoMediaPlaylist {
                            url: variant.url.clone(),
                        }
                        .into());
                    }
                }
            }
        };

        if media.segments.is_empty() {
            return Err(LoaderError::NoSegments {
                url: self.url.clone(),
            }
            .into());
        }
        Ok(media)
    }

    /// Sends a non-terminal event, giving up when cancelled or when the
    /// receiver is gone.
    async fn emit(&self, event: DownloadEvent) -> Result<(), Failure> {
        let sent = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(Failure::from(LoaderError::Cancelled)),
            sent = self.events.send(event) => sent,
        };

        if sent.is_err() {
            debug!(url = %self.url, "Event receiver dropped, stopping download");
            self.token.cancel();
            return Err(Failure::from(LoaderError::Cancelled));
        }
        Ok(())
    }
}
