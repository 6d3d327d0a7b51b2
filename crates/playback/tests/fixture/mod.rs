#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use parking_lot::Mutex;
use playback::{
    DemuxEngine, DemuxError, DemuxedSample, PipelineError, PlaybackSink, PreparedTrack,
    SampleFlags, TrackFormat, TrackType,
};
use tokio::net::TcpListener;

pub const SEGMENT_LEN: usize = 1024;
/// First byte of segments the fake engine refuses to demux.
pub const BAD_SEGMENT_MARKER: u8 = 0xEE;

pub const VIDEO_PER_SEGMENT: usize = 3;
pub const AUDIO_PER_SEGMENT: usize = 4;
pub const VIDEO_FRAME_US: i64 = 33_333;
pub const AUDIO_FRAME_US: i64 = 23_219;
/// AAC-LC, 44.1 kHz, stereo.
pub const AAC_LC_CONFIG: &[u8] = &[0x12, 0x10];

pub struct TestServer {
    base_url: String,
}

impl TestServer {
    pub async fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new()
            .route("/media.m3u8", get(|| async { playlist(&["0", "1", "2"]) }))
            .route(
                "/long.m3u8",
                get(|| async {
                    let names: Vec<String> = (0..10).map(|i| i.to_string()).collect();
                    let names: Vec<&str> = names.iter().map(String::as_str).collect();
                    playlist(&names)
                }),
            )
            .route("/bad-demux.m3u8", get(|| async { playlist(&["0", "bad", "2"]) }))
            .route("/unprobeable.m3u8", get(|| async { playlist(&["bad", "1"]) }))
            .route("/seg/{name}", get(segment_endpoint));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", addr.port()),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn playlist(names: &[&str]) -> String {
    let mut text = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
    for name in names {
        text.push_str(&format!("#EXTINF:10.0,\nseg/{name}.ts\n"));
    }
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

async fn segment_endpoint(Path(name): Path<String>) -> Response {
    let Some(stem) = name.strip_suffix(".ts") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if stem == "bad" {
        return vec![BAD_SEGMENT_MARKER; SEGMENT_LEN].into_response();
    }
    match stem.parse::<u8>() {
        Ok(index) => vec![index; SEGMENT_LEN].into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Demuxes the fixture's synthetic segments.
///
/// Every segment restarts its clock at zero: three video frames (the first a
/// keyframe) and four ADTS-framed AAC frames whose payload is
/// `[segment byte, frame number]`.
pub struct FakeEngine;

impl DemuxEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn probe(&mut self, data: &Bytes) -> Result<Vec<TrackFormat>, DemuxError> {
        if data.first() == Some(&BAD_SEGMENT_MARKER) {
            return Err(DemuxError::InvalidData("no sync byte".into()));
        }
        Ok(vec![
            TrackFormat::video(TrackFormat::MIME_AVC, 1280, 720),
            TrackFormat::audio(TrackFormat::MIME_AAC, 44_100, 2).with_extra_data(AAC_LC_CONFIG),
        ])
    }

    fn demux(&mut self, data: &Bytes) -> Result<Vec<DemuxedSample>, DemuxError> {
        let marker = *data.first().ok_or(DemuxError::InvalidData("empty".into()))?;
        if marker == BAD_SEGMENT_MARKER {
            return Err(DemuxError::InvalidData("corrupt packet".into()));
        }

        let mut samples = Vec::new();
        for frame in 0..VIDEO_PER_SEGMENT {
            let flags = if frame == 0 {
                SampleFlags::KEY_FRAME
            } else {
                SampleFlags::empty()
            };
            samples.push(DemuxedSample::new(
                TrackType::Video,
                Some(frame as i64 * VIDEO_FRAME_US),
                flags,
                vec![0, 0, 0, 1, 0x65, marker],
            ));
        }
        for frame in 0..AUDIO_PER_SEGMENT {
            let mut payload = vec![0xFF, 0xF1, 0x50, 0x80, 0x00, 0x1F, 0xFC];
            payload.extend_from_slice(&[marker, frame as u8]);
            samples.push(DemuxedSample::new(
                TrackType::Audio,
                Some(frame as i64 * AUDIO_FRAME_US),
                SampleFlags::KEY_FRAME,
                payload,
            ));
        }
        Ok(samples)
    }
}

#[derive(Debug, Clone)]
pub enum SinkEvent {
    Prepared(Vec<TrackType>),
    Duration(i64),
    Progress(f32),
    SegmentError(usize, String),
    Error(String),
    PlayWhenReady(bool),
}

/// Records every callback and keeps the latest prepared tracks.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    tracks: Mutex<Vec<PreparedTrack>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn tracks(&self) -> Vec<PreparedTrack> {
        self.tracks.lock().clone()
    }

    pub fn prepared_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Prepared(_)))
            .count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl PlaybackSink for RecordingSink {
    fn on_prepared(&self, tracks: &[PreparedTrack]) {
        *self.tracks.lock() = tracks.to_vec();
        self.push(SinkEvent::Prepared(
            tracks.iter().map(PreparedTrack::track_type).collect(),
        ));
    }

    fn on_duration(&self, duration_us: i64) {
        self.push(SinkEvent::Duration(duration_us));
    }

    fn on_progress(&self, fraction: f32) {
        self.push(SinkEvent::Progress(fraction));
    }

    fn on_segment_error(&self, index: usize, error: &PipelineError) {
        self.push(SinkEvent::SegmentError(index, error.to_string()));
    }

    fn on_error(&self, error: &PipelineError) {
        self.push(SinkEvent::Error(error.to_string()));
    }

    fn on_play_when_ready(&self, play_when_ready: bool) {
        self.push(SinkEvent::PlayWhenReady(play_when_ready));
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("playback=debug,hls_loader=debug")
        .with_test_writer()
        .try_init();
}

/// Polls `condition` every 10ms, panicking after `timeout`.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(timeout, wait)
        .await
        .expect("condition not reached in time");
}

/// Awaits `future`, panicking after `timeout`.
pub async fn within<T>(timeout: Duration, future: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, future)
        .await
        .expect("operation did not finish in time")
}
