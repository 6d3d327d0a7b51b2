//! ADTS framing detection and removal.
//!
//! Transport-stream AAC usually arrives with a 7-byte ADTS header in front of
//! every access unit (9 bytes when a CRC is present). Decoders fed with an
//! AudioSpecificConfig expect raw access units, so the header is removed.

use bytes::Bytes;

/// Header length when `protection_absent` is set.
pub const ADTS_HEADER_LEN: usize = 7;
/// Header length when a CRC follows the fixed header.
pub const ADTS_HEADER_LEN_WITH_CRC: usize = 9;

/// Returns `true` when `data` starts with the 12-bit ADTS syncword.
#[inline]
pub fn has_adts_header(data: &[u8]) -> bool {
    data.len() >= ADTS_HEADER_LEN && data[0] == 0xFF && (data[1] & 0xF0) == 0xF0
}

/// Header length implied by the `protection_absent` bit.
#[inline]
fn adts_header_len(data: &[u8]) -> usize {
    if data[1] & 0x01 == 1 {
        ADTS_HEADER_LEN
    } else {
        ADTS_HEADER_LEN_WITH_CRC
    }
}

/// Returns the access unit without its ADTS header.
///
/// Returns `None` when there is no header or when nothing would remain after
/// removing it; callers keep the original payload in that case.
pub fn strip_adts_header(data: &Bytes) -> Option<Bytes> {
    if !has_adts_header(data) {
        return None;
    }
    let header_len = adts_header_len(data);
    if data.len() <= header_len {
        return None;
    }
    Some(data.slice(header_len..))
}
