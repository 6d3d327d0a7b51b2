//! Sequential HLS downloader.
//!
//! [`SegmentDownloader::download`] fetches a playlist (following a master
//! playlist to its highest-bandwidth variant), then downloads every segment
//! in order and reports each step as a [`DownloadEvent`] on a bounded
//! channel. Each session ends with exactly one terminal event.

mod client;
pub mod config;
mod downloader;
pub mod error;
pub mod events;
mod fetcher;

pub use client::create_client;
pub use config::{DEFAULT_USER_AGENT, LoaderConfig};
pub use downloader::SegmentDownloader;
pub use error::LoaderError;
pub use events::DownloadEvent;

pub use hls::{DownloadedSegment, MediaPlaylist, Playlist, Segment};
