//! M3U8 serialization through `Display`.
//!
//! Output uses the resolved absolute URLs, so re-parsing it against any base
//! yields the same segment and variant URLs.

use std::fmt::{self, Display, Formatter};

use crate::playlist::{EncryptionInfo, MasterPlaylist, MediaPlaylist, Playlist};

impl Display for Playlist {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Playlist::Master(master) => Display::fmt(master, f),
            Playlist::Media(media) => Display::fmt(media, f),
        }
    }
}

impl Display for MasterPlaylist {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        for variant in &self.variants {
            write!(f, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth)?;
            if let Some(resolution) = &variant.resolution {
                write!(f, ",RESOLUTION={resolution}")?;
            }
            if let Some(codecs) = &variant.codecs {
                write!(f, ",CODECS=\"{codecs}\"")?;
            }
            if let Some(name) = &variant.name {
                write!(f, ",NAME=\"{name}\"")?;
            }
            writeln!(f)?;
            writeln!(f, "{}", variant.url)?;
        }
        Ok(())
    }
}

impl Display for MediaPlaylist {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // EXT-X-BYTERANGE needs protocol version 4.
        let version = if self.segments.iter().any(|s| s.byte_range_length.is_some()) {
            4
        } else {
            3
        };

        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{version}")?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", self.target_duration)?;
        writeln!(f, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence)?;
        if let Some(playlist_type) = &self.playlist_type {
            writeln!(f, "#EXT-X-PLAYLIST-TYPE:{}", playlist_type.as_str())?;
        }

        let mut current_key: Option<&EncryptionInfo> = None;
        for segment in &self.segments {
            if segment.encryption.as_ref() != current_key {
                write_key(f, segment.encryption.as_ref())?;
                current_key = segment.encryption.as_ref();
            }
            if segment.discontinuity {
                writeln!(f, "#EXT-X-DISCONTINUITY")?;
            }
            writeln!(
                f,
                "#EXTINF:{},{}",
                segment.duration,
                segment.title.as_deref().unwrap_or_default()
            )?;
            match (segment.byte_range_length, segment.byte_range_offset) {
                (Some(length), Some(offset)) => writeln!(f, "#EXT-X-BYTERANGE:{length}@{offset}")?,
                (Some(length), None) => writeln!(f, "#EXT-X-BYTERANGE:{length}")?,
                _ => {}
            }
            writeln!(f, "{}", segment.url)?;
        }

        if self.end_list {
            writeln!(f, "#EXT-X-ENDLIST")?;
        }
        Ok(())
    }
}

fn write_key(f: &mut Formatter<'_>, key: Option<&EncryptionInfo>) -> fmt::Result {
    let Some(key) = key else {
        return writeln!(f, "#EXT-X-KEY:METHOD=NONE");
    };
    write!(f, "#EXT-X-KEY:METHOD={},URI=\"{}\"", key.method, key.key_url)?;
    if let Some(iv) = &key.iv {
        write!(f, ",IV={iv}")?;
    }
    writeln!(f)
}
