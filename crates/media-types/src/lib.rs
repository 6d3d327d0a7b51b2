//! Media domain types shared by the playlist, loader and playback crates.

mod nal;
mod resolution;
mod sample;
mod track;

pub use nal::{avc_config_nal_units, split_annex_b};
pub use resolution::{ParseResolutionError, Resolution};
pub use sample::{DemuxedSample, SampleFlags};
pub use track::{
    DEFAULT_CHANNEL_COUNT, DEFAULT_RESOLUTION, DEFAULT_SAMPLE_RATE, TrackFormat, TrackType,
};
