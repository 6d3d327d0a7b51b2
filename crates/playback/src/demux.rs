use aac::{frame_duration_us, samples_per_frame, strip_adts_header};
use bytes::Bytes;
use media_types::{DemuxedSample, TrackFormat, TrackType};
use tracing::{debug, info};

use crate::DemuxError;

/// Container demuxer used by the pipeline.
///
/// `probe` is called on the first segment of a session to discover its
/// tracks; `demux` is called on every segment and returns samples with
/// segment-local timestamps. Implementations may keep codec state between
/// calls; calls are never made concurrently.
pub trait DemuxEngine: Send {
    fn name(&self) -> &'static str;

    fn probe(&mut self, data: &Bytes) -> Result<Vec<TrackFormat>, DemuxError>;

    fn demux(&mut self, data: &Bytes) -> Result<Vec<DemuxedSample>, DemuxError>;

    /// Frees native resources. Later calls may fail with [`DemuxError::Released`].
    fn release(&mut self) {}
}

/// Wraps a [`DemuxEngine`] with the per-session track state.
pub struct DemuxAdapter {
    engine: Box<dyn DemuxEngine>,
    tracks: Option<Vec<TrackFormat>>,
    audio_frame_duration_us: Option<i64>,
    strip_adts: bool,
    released: bool,
}

impl DemuxAdapter {
    pub fn new(engine: Box<dyn DemuxEngine>, strip_adts: bool) -> Self {
        Self {
            engine,
            tracks: None,
            audio_frame_duration_us: None,
            strip_adts,
            released: false,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn tracks(&self) -> Option<&[TrackFormat]> {
        self.tracks.as_deref()
    }

    pub fn has_tracks(&self) -> bool {
        self.tracks.is_some()
    }

    pub fn track(&self, track_type: TrackType) -> Option<&TrackFormat> {
        self.tracks
            .as_deref()?
            .iter()
            .find(|t| t.track_type == track_type)
    }

    /// Duration of one audio access unit, derived from the audio track's
    /// AudioSpecificConfig and sample rate. `None` without an audio track
    /// or with an unknown sample rate.
    pub fn audio_frame_duration_us(&self) -> Option<i64> {
        self.audio_frame_duration_us
    }

    /// Discovers the tracks of a session. Only the first successful probe
    /// counts; later calls return the established tracks.
    pub fn probe(&mut self, data: &Bytes) -> Result<&[TrackFormat], DemuxError> {
        if self.released {
            return Err(DemuxError::Released);
        }

        if self.tracks.is_none() {
            let mut tracks: Vec<TrackFormat> = self
                .engine
                .probe(data)?
                .into_iter()
                .filter(|t| t.is_audio() || t.is_video())
                .collect();
            if tracks.is_empty() {
                return Err(DemuxError::NoTracks);
            }
            // One track per type; the first reported wins.
            let mut seen = Vec::with_capacity(2);
            tracks.retain(|t| {
                let first = !seen.contains(&t.track_type);
                seen.push(t.track_type);
                first
            });

            self.audio_frame_duration_us = tracks.iter().find(|t| t.is_audio()).and_then(|t| {
                let spf = samples_per_frame(t.extra_data.as_deref());
                frame_duration_us(spf, t.sample_rate)
            });

            for track in &tracks {
                info!(engine = self.engine.name(), %track, "Discovered track");
            }
            self.tracks = Some(tracks);
        }

        Ok(self.tracks.as_deref().unwrap_or_default())
    }

    /// Demuxes one segment. AAC payloads lose their ADTS header when
    /// stripping is enabled; video payloads are returned untouched.
    pub fn demux(&mut self, data: &Bytes) -> Result<Vec<DemuxedSample>, DemuxError> {
        if self.released {
            return Err(DemuxError::Released);
        }

        let mut samples = self.engine.demux(data)?;
        if self.should_strip_adts() {
            let mut stripped = 0usize;
            for sample in samples.iter_mut().filter(|s| s.is_audio()) {
                if let Some(payload) = strip_adts_header(&sample.data) {
                    sample.data = payload;
                    stripped += 1;
                }
            }
            if stripped > 0 {
                debug!(stripped, "Removed ADTS headers");
            }
        }
        Ok(samples)
    }

    fn should_strip_adts(&self) -> bool {
        self.strip_adts && self.track(TrackType::Audio).is_some_and(TrackFormat::is_aac)
    }

    /// Forgets the discovered tracks so the next session probes again.
    pub fn reset(&mut self) {
        self.tracks = None;
        self.audio_frame_duration_us = None;
    }

    pub fn release(&mut self) {
        if !self.released {
            debug!(engine = self.engine.name(), "Releasing demux engine");
            self.engine.release();
            self.released = true;
        }
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use media_types::SampleFlags;

    use super::*;

    /// Reports fixed tracks and returns the input as one video and one
    /// audio sample.
    struct EchoEngine {
        tracks: Vec<TrackFormat>,
    }

    impl DemuxEngine for EchoEngine {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn probe(&mut self, _data: &Bytes) -> Result<Vec<TrackFormat>, DemuxError> {
            Ok(self.tracks.clone())
        }

        fn demux(&mut self, data: &Bytes) -> Result<Vec<DemuxedSample>, DemuxError> {
            Ok(vec![
                DemuxedSample::new(TrackType::Video, Some(0), SampleFlags::KEY_FRAME, data.clone()),
                DemuxedSample::new(TrackType::Audio, Some(0), SampleFlags::KEY_FRAME, data.clone()),
            ])
        }
    }

    fn adapter(tracks: Vec<TrackFormat>) -> DemuxAdapter {
        DemuxAdapter::new(
            Box::new(EchoEngine { tracks }),
            true,
        )
    }

    fn aac_track(sample_rate: u32, config: &'static [u8]) -> TrackFormat {
        TrackFormat::audio(TrackFormat::MIME_AAC, sample_rate, 2).with_extra_data(config)
    }

    fn adts_frame(payload: &[u8]) -> Bytes {
        let mut frame = vec![0xFF, 0xF1, 0x50, 0x80, 0x00, 0x1F, 0xFC];
        frame.extend_from_slice(payload);
        Bytes::from(frame)
    }

    #[test]
    fn probe_establishes_tracks_once() {
        let mut adapter = adapter(vec![
            TrackFormat::video(TrackFormat::MIME_AVC, 1280, 720),
            aac_track(48_000, &[0x11, 0x90]),
        ]);
        assert_eq!(adapter.probe(&Bytes::new()).unwrap().len(), 2);
        assert_eq!(adapter.probe(&Bytes::new()).unwrap().len(), 2);
        assert!(adapter.has_tracks());
        assert_eq!(adapter.track(TrackType::Video).unwrap().width, 1280);
    }

    #[test]
    fn probe_without_tracks_fails() {
        let mut adapter = adapter(vec![]);
        assert_eq!(adapter.probe(&Bytes::new()), Err(DemuxError::NoTracks));
        assert!(!adapter.has_tracks());
    }

    #[test]
    fn frame_duration_follows_audio_object_type() {
        // AAC-LC, 44.1 kHz: 1024 samples per frame.
        let mut lc = adapter(vec![aac_track(44_100, &[0x12, 0x10])]);
        lc.probe(&Bytes::new()).unwrap();
        assert_eq!(lc.audio_frame_duration_us(), Some(23_219));

        // HE-AAC (SBR) signalled explicitly: 2048 samples per frame.
        let mut he = adapter(vec![aac_track(48_000, &[0x2b, 0x11, 0x88, 0x00])]);
        he.probe(&Bytes::new()).unwrap();
        assert_eq!(he.audio_frame_duration_us(), Some(42_666));

        let mut unknown_rate = adapter(vec![aac_track(0, &[0x12, 0x10])]);
        unknown_rate.probe(&Bytes::new()).unwrap();
        assert_eq!(unknown_rate.audio_frame_duration_us(), None);
    }

    #[test]
    fn demux_strips_adts_from_aac_audio_only() {
        let mut adapter = adapter(vec![
            TrackFormat::video(TrackFormat::MIME_AVC, 0, 0),
            aac_track(44_100, &[0x12, 0x10]),
        ]);
        adapter.probe(&Bytes::new()).unwrap();

        let samples = adapter.demux(&adts_frame(&[1, 2, 3])).unwrap();
        let video = samples.iter().find(|s| s.is_video()).unwrap();
        let audio = samples.iter().find(|s| s.is_audio()).unwrap();
        assert_eq!(video.data.len(), 10);
        assert_eq!(&audio.data[..], &[1, 2, 3]);
    }

    #[test]
    fn demux_keeps_adts_when_disabled() {
        let mut adapter = DemuxAdapter::new(
            Box::new(EchoEngine {
                tracks: vec![aac_track(44_100, &[0x12, 0x10])],
            }),
            false,
        );
        adapter.probe(&Bytes::new()).unwrap();
        let samples = adapter.demux(&adts_frame(&[9])).unwrap();
        assert!(samples.iter().all(|s| s.data.len() == 8));
    }

    #[test]
    fn release_rejects_further_work() {
        let mut adapter = adapter(vec![aac_track(44_100, &[0x12, 0x10])]);
        adapter.probe(&Bytes::new()).unwrap();
        adapter.release();
        adapter.release();
        assert!(!adapter.has_tracks());
        assert_eq!(adapter.demux(&Bytes::new()), Err(DemuxError::Released));
    }
}
