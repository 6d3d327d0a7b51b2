#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaylistError {
    #[error("not an M3U8 playlist: first line is not #EXTM3U")]
    MissingHeader,

    #[error("invalid byte range `{value}`: {reason}")]
    InvalidByteRange { value: String, reason: String },
}

impl PlaylistError {
    pub fn invalid_byte_range(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidByteRange {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
