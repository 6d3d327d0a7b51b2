//! M3U8 text parser.
//!
//! The parser is a single forward pass over trimmed, non-empty lines. Media
//! playlists thread a [`MediaState`] record through a fold: describing tags
//! (`#EXTINF`, `#EXT-X-BYTERANGE`, `#EXT-X-DISCONTINUITY`) accumulate as
//! pending state that is consumed by the next URI line, while `#EXT-X-KEY`
//! stays in effect until replaced. Master playlists work the same way with a
//! pending `#EXT-X-STREAM-INF`.
//!
//! A playlist is a master playlist when any `#EXT-X-STREAM-INF` tag appears
//! anywhere in the text.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::attributes::parse_attributes;
use crate::playlist::{
    EncryptionInfo, MasterPlaylist, MediaPlaylist, Playlist, PlaylistType, Segment, Variant,
};
use crate::resolve::resolve_url;
use crate::PlaylistError;

const TAG_EXTM3U: &str = "#EXTM3U";
const TAG_STREAM_INF: &str = "#EXT-X-STREAM-INF";
const TAG_TARGET_DURATION: &str = "#EXT-X-TARGETDURATION";
const TAG_MEDIA_SEQUENCE: &str = "#EXT-X-MEDIA-SEQUENCE";
const TAG_EXTINF: &str = "#EXTINF";
const TAG_KEY: &str = "#EXT-X-KEY";
const TAG_BYTERANGE: &str = "#EXT-X-BYTERANGE";
const TAG_DISCONTINUITY: &str = "#EXT-X-DISCONTINUITY";
const TAG_ENDLIST: &str = "#EXT-X-ENDLIST";
const TAG_PLAYLIST_TYPE: &str = "#EXT-X-PLAYLIST-TYPE";

/// Target duration used when `#EXT-X-TARGETDURATION` is missing or invalid.
pub const DEFAULT_TARGET_DURATION: u64 = 10;

/// What a `#EXT-X-BYTERANGE` without an `@offset` means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteRangeOffsetPolicy {
    /// The range starts right after the previous range of the same resource,
    /// or at byte 0 when there is none.
    #[default]
    Contiguous,
    /// Leave the offset unset; the segment is fetched without a `Range` header.
    Unset,
    /// Treat the missing offset as a parse error.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    pub byte_range_offset: ByteRangeOffsetPolicy,
}

impl ParseOptions {
    pub fn with_byte_range_offset(mut self, policy: ByteRangeOffsetPolicy) -> Self {
        self.byte_range_offset = policy;
        self
    }
}

/// Parses playlist text fetched from `base_url` with default options.
pub fn parse_playlist(text: &str, base_url: &str) -> Result<Playlist, PlaylistError> {
    parse_playlist_with(text, base_url, &ParseOptions::default())
}

pub fn parse_playlist_with(
    text: &str,
    base_url: &str,
    options: &ParseOptions,
) -> Result<Playlist, PlaylistError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some((first, body)) = lines.split_first() else {
        return Err(PlaylistError::MissingHeader);
    };
    if !first.starts_with(TAG_EXTM3U) {
        return Err(PlaylistError::MissingHeader);
    }

    let is_master = body.iter().any(|line| line.starts_with(TAG_STREAM_INF));
    if is_master {
        Ok(Playlist::Master(parse_master(body, base_url)))
    } else {
        parse_media(body, base_url, options).map(Playlist::Media)
    }
}

/// Splits `#TAG:value` into `("#TAG", "value")`.
fn split_tag(line: &str) -> (&str, &str) {
    line.split_once(':').unwrap_or((line, ""))
}

#[derive(Default)]
struct MasterState {
    pending: Option<HashMap<String, String>>,
    variants: Vec<Variant>,
}

impl MasterState {
    fn apply(mut self, line: &str, base_url: &str) -> Self {
        if line.starts_with('#') {
            let (tag, value) = split_tag(line);
            if tag == TAG_STREAM_INF {
                if self.pending.is_some() {
                    trace!("Dropping #EXT-X-STREAM-INF without URI");
                }
                self.pending = Some(parse_attributes(value));
            }
            return self;
        }

        if let Some(mut attrs) = self.pending.take() {
            self.variants.push(Variant {
                url: resolve_url(base_url, line),
                bandwidth: attrs
                    .get("BANDWIDTH")
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(0),
                resolution: attrs.remove("RESOLUTION"),
                codecs: attrs.remove("CODECS"),
                name: attrs.remove("NAME"),
            });
        }
        self
    }
}

fn parse_master(lines: &[&str], base_url: &str) -> MasterPlaylist {
    let state = lines
        .iter()
        .fold(MasterState::default(), |state, line| state.apply(line, base_url));

    MasterPlaylist {
        base_url: base_url.to_string(),
        variants: state.variants,
    }
}

struct PendingSegment {
    duration: f64,
    title: Option<String>,
}

struct PendingByteRange {
    length: u64,
    offset: Option<u64>,
}

struct MediaState {
    policy: ByteRangeOffsetPolicy,
    target_duration: Option<u64>,
    media_sequence: u64,
    next_sequence: u64,
    playlist_type: Option<PlaylistType>,
    end_list: bool,
    key: Option<EncryptionInfo>,
    pending_segment: Option<PendingSegment>,
    pending_range: Option<PendingByteRange>,
    pending_discontinuity: bool,
    /// Resolved URL and end offset of the last byte range, for offset inference.
    last_range: Option<(String, u64)>,
    segments: Vec<Segment>,
}

impl MediaState {
    fn new(options: &ParseOptions) -> Self {
        Self {
            policy: options.byte_range_offset,
            target_duration: None,
            media_sequence: 0,
            next_sequence: 0,
            playlist_type: None,
            end_list: false,
            key: None,
            pending_segment: None,
            pending_range: None,
            pending_discontinuity: false,
            last_range: None,
            segments: Vec::new(),
        }
    }

    fn apply(mut self, line: &str, base_url: &str) -> Result<Self, PlaylistError> {
        if !line.starts_with('#') {
            self.push_segment(line, base_url)?;
            return Ok(self);
        }

        let (tag, value) = split_tag(line);
        match tag {
            TAG_TARGET_DURATION => {
                self.target_duration = parse_target_duration(value);
            }
            TAG_MEDIA_SEQUENCE => {
                self.media_sequence = value.trim().parse().unwrap_or(0);
                self.next_sequence = self.media_sequence;
            }
            TAG_PLAYLIST_TYPE => {
                self.playlist_type = Some(PlaylistType::from_tag_value(value.trim()));
            }
            TAG_ENDLIST => self.end_list = true,
            TAG_DISCONTINUITY => self.pending_discontinuity = true,
            TAG_KEY => self.key = parse_key(value, base_url),
            TAG_BYTERANGE => {
                self.pending_range = parse_byte_range(value, self.policy)?;
            }
            TAG_EXTINF => {
                if self.pending_segment.is_some() {
                    trace!("Dropping #EXTINF without URI");
                }
                let (duration, title) = value.split_once(',').unwrap_or((value, ""));
                let duration = duration.trim().parse().unwrap_or_else(|_| {
                    warn!(value, "Invalid #EXTINF duration, using 0");
                    0.0
                });
                let title = Some(title.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                self.pending_segment = Some(PendingSegment { duration, title });
            }
            _ => {}
        }
        Ok(self)
    }

    fn push_segment(&mut self, uri: &str, base_url: &str) -> Result<(), PlaylistError> {
        let Some(pending) = self.pending_segment.take() else {
            trace!(uri, "Ignoring URI line without #EXTINF");
            return Ok(());
        };

        let url = resolve_url(base_url, uri);
        let (byte_range_offset, byte_range_length) = match self.pending_range.take() {
            Some(range) => {
                let offset = range.offset.or_else(|| match self.policy {
                    ByteRangeOffsetPolicy::Contiguous => Some(
                        self.last_range
                            .as_ref()
                            .filter(|(last_url, _)| *last_url == url)
                            .map_or(0, |(_, end)| *end),
                    ),
                    ByteRangeOffsetPolicy::Unset | ByteRangeOffsetPolicy::Reject => None,
                });
                if let Some(offset) = offset {
                    let end = offset.checked_add(range.length).ok_or_else(|| {
                        PlaylistError::invalid_byte_range(
                            format!("{}@{offset}", range.length),
                            "range ends past u64::MAX",
                        )
                    })?;
                    self.last_range = Some((url.clone(), end));
                }
                (offset, Some(range.length))
            }
            None => (None, None),
        };

        self.segments.push(Segment {
            url,
            duration: pending.duration,
            sequence_number: self.next_sequence,
            title: pending.title,
            byte_range_offset,
            byte_range_length,
            encryption: self.key.clone(),
            discontinuity: std::mem::take(&mut self.pending_discontinuity),
        });
        self.next_sequence += 1;
        Ok(())
    }

    fn finish(self, base_url: &str) -> MediaPlaylist {
        if self.pending_segment.is_some() {
            trace!("Dropping trailing #EXTINF without URI");
        }
        MediaPlaylist {
            base_url: base_url.to_string(),
            target_duration: self.target_duration.unwrap_or(DEFAULT_TARGET_DURATION),
            media_sequence: self.media_sequence,
            segments: self.segments,
            end_list: self.end_list,
            playlist_type: self.playlist_type,
        }
    }
}

fn parse_media(
    lines: &[&str],
    base_url: &str,
    options: &ParseOptions,
) -> Result<MediaPlaylist, PlaylistError> {
    let state = lines
        .iter()
        .try_fold(MediaState::new(options), |state, line| {
            state.apply(line, base_url)
        })?;
    Ok(state.finish(base_url))
}

fn parse_target_duration(value: &str) -> Option<u64> {
    let value = value.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|d| d.ceil() as u64))
}

fn parse_key(value: &str, base_url: &str) -> Option<EncryptionInfo> {
    let mut attrs = parse_attributes(value);
    let method = attrs.remove("METHOD")?;
    if method == "NONE" {
        return None;
    }
    let Some(uri) = attrs.remove("URI") else {
        warn!(method = %method, "#EXT-X-KEY without URI, ignoring");
        return None;
    };

    Some(EncryptionInfo {
        method,
        key_url: resolve_url(base_url, &uri),
        iv: attrs.remove("IV"),
    })
}

fn parse_byte_range(
    value: &str,
    policy: ByteRangeOffsetPolicy,
) -> Result<Option<PendingByteRange>, PlaylistError> {
    let value = value.trim();
    let (length, offset) = match value.split_once('@') {
        Some((length, offset)) => (length, Some(offset)),
        None => (value, None),
    };

    let Ok(length) = length.trim().parse::<u64>() else {
        warn!(value, "Invalid #EXT-X-BYTERANGE length, ignoring");
        return Ok(None);
    };
    let offset = match offset.map(|o| o.trim().parse::<u64>()) {
        Some(Ok(offset)) => Some(offset),
        Some(Err(_)) => {
            warn!(value, "Invalid #EXT-X-BYTERANGE offset, ignoring");
            return Ok(None);
        }
        None if policy == ByteRangeOffsetPolicy::Reject => {
            return Err(PlaylistError::invalid_byte_range(value, "missing offset"));
        }
        None => None,
    };

    Ok(Some(PendingByteRange { length, offset }))
}
