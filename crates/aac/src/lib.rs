//! AAC helpers used when normalizing demuxed audio.
//!
//! - [`AudioSpecificConfig`] parses the codec initialization data to learn the
//!   audio object type and therefore how many PCM samples one access unit
//!   decodes to.
//! - [`adts`] detects and strips ADTS framing headers from access units.

pub mod adts;
mod bits;
mod config;
mod error;

pub use adts::{ADTS_HEADER_LEN, ADTS_HEADER_LEN_WITH_CRC, has_adts_header, strip_adts_header};
pub use config::{
    AAC_HE_SAMPLES_PER_FRAME, AAC_LC_SAMPLES_PER_FRAME, AAC_LD_SAMPLES_PER_FRAME,
    AAC_XHE_SAMPLES_PER_FRAME, AudioObjectType, AudioSpecificConfig, SAMPLING_FREQUENCIES,
    frame_duration_us, samples_per_frame,
};
pub use error::AacError;
