#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AacError {
    #[error("AudioSpecificConfig truncated after {bits_read} bits")]
    Truncated { bits_read: usize },

    #[error("reserved sampling frequency index {0}")]
    ReservedSamplingFrequencyIndex(u8),

    #[error("zero sampling frequency")]
    ZeroSamplingFrequency,
}
