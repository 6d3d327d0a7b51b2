// HLS (HTTP Live Streaming) playlist handling
pub mod attributes;
pub mod error;
pub mod parser;
pub mod playlist;
pub mod resolve;
pub mod segment;
mod writer;

// Export common types for ease of use
pub use error::PlaylistError;
pub use media_types::Resolution;
pub use parser::{ByteRangeOffsetPolicy, ParseOptions, parse_playlist, parse_playlist_with};
pub use playlist::{
    EncryptionInfo, MasterPlaylist, MediaPlaylist, Playlist, PlaylistType, Segment, Variant,
};
pub use resolve::resolve_url;
pub use segment::DownloadedSegment;
