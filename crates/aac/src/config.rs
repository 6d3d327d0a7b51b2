use crate::AacError;
use crate::bits::BitReader;

/// PCM samples per access unit for AAC-LC, Main, LTP and xHE-AAC.
pub const AAC_LC_SAMPLES_PER_FRAME: u32 = 1024;
/// PCM samples per access unit for HE-AAC (SBR) and HE-AACv2 (PS).
pub const AAC_HE_SAMPLES_PER_FRAME: u32 = 2048;
/// PCM samples per access unit for the low-delay family (LD, ELD).
pub const AAC_LD_SAMPLES_PER_FRAME: u32 = 512;
/// PCM samples per access unit for xHE-AAC (USAC).
pub const AAC_XHE_SAMPLES_PER_FRAME: u32 = 1024;

/// Sampling frequencies addressed by the 4-bit `samplingFrequencyIndex`.
pub const SAMPLING_FREQUENCIES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
    8_000, 7_350,
];

const ESCAPE_OBJECT_TYPE: u8 = 31;
const EXPLICIT_FREQUENCY_INDEX: u8 = 15;

/// MPEG-4 audio object type (ISO/IEC 14496-3, table 1.17).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioObjectType {
    AacMain,
    AacLc,
    AacSsr,
    AacLtp,
    /// Spectral band replication (HE-AAC).
    Sbr,
    AacScalable,
    ErAacLd,
    /// Parametric stereo (HE-AACv2).
    Ps,
    ErAacEld,
    /// Unified speech and audio coding (xHE-AAC).
    Usac,
    Other(u8),
}

impl AudioObjectType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AacMain,
            2 => Self::AacLc,
            3 => Self::AacSsr,
            4 => Self::AacLtp,
            5 => Self::Sbr,
            6 => Self::AacScalable,
            23 => Self::ErAacLd,
            29 => Self::Ps,
            39 => Self::ErAacEld,
            42 => Self::Usac,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::AacMain => 1,
            Self::AacLc => 2,
            Self::AacSsr => 3,
            Self::AacLtp => 4,
            Self::Sbr => 5,
            Self::AacScalable => 6,
            Self::ErAacLd => 23,
            Self::Ps => 29,
            Self::ErAacEld => 39,
            Self::Usac => 42,
            Self::Other(v) => *v,
        }
    }

    /// Number of PCM samples one access unit of this object type decodes to.
    ///
    /// Unknown object types are treated as AAC-LC.
    pub fn samples_per_frame(&self) -> u32 {
        match self {
            Self::Sbr | Self::Ps => AAC_HE_SAMPLES_PER_FRAME,
            Self::ErAacLd | Self::ErAacEld => AAC_LD_SAMPLES_PER_FRAME,
            Self::Usac => AAC_XHE_SAMPLES_PER_FRAME,
            _ => AAC_LC_SAMPLES_PER_FRAME,
        }
    }
}

impl From<u8> for AudioObjectType {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

/// The leading fields of an MPEG-4 `AudioSpecificConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Object type as signaled, e.g. `Sbr` for explicitly signaled HE-AAC.
    pub audio_object_type: AudioObjectType,
    /// Underlying core object type; differs from `audio_object_type` only
    /// for explicit SBR/PS signaling.
    pub core_object_type: AudioObjectType,
    /// Output sampling frequency (the extension frequency for explicit SBR/PS).
    pub sampling_frequency: u32,
    pub channel_configuration: u8,
}

impl AudioSpecificConfig {
    pub fn parse(data: &[u8]) -> Result<Self, AacError> {
        let mut reader = BitReader::new(data);

        let audio_object_type = read_object_type(&mut reader)?;
        let mut sampling_frequency = read_sampling_frequency(&mut reader)?;
        let channel_configuration = reader.read_u8(4)?;

        let mut core_object_type = audio_object_type;
        if matches!(audio_object_type, AudioObjectType::Sbr | AudioObjectType::Ps) {
            sampling_frequency = read_sampling_frequency(&mut reader)?;
            core_object_type = read_object_type(&mut reader)?;
        }

        Ok(Self {
            audio_object_type,
            core_object_type,
            sampling_frequency,
            channel_configuration,
        })
    }

    /// RFC 6381 codec string, e.g. `mp4a.40.2`.
    pub fn codec_string(&self) -> String {
        format!("mp4a.40.{}", self.audio_object_type.as_u8())
    }

    pub fn samples_per_frame(&self) -> u32 {
        self.audio_object_type.samples_per_frame()
    }
}

fn read_object_type(reader: &mut BitReader<'_>) -> Result<AudioObjectType, AacError> {
    let mut value = reader.read_u8(5)?;
    if value == ESCAPE_OBJECT_TYPE {
        value = 32 + reader.read_u8(6)?;
    }
    Ok(AudioObjectType::from_u8(value))
}

fn read_sampling_frequency(reader: &mut BitReader<'_>) -> Result<u32, AacError> {
    let index = reader.read_u8(4)?;
    let frequency = if index == EXPLICIT_FREQUENCY_INDEX {
        reader.read_bits(24)?
    } else {
        *SAMPLING_FREQUENCIES
            .get(index as usize)
            .ok_or(AacError::ReservedSamplingFrequencyIndex(index))?
    };

    if frequency == 0 {
        return Err(AacError::ZeroSamplingFrequency);
    }
    Ok(frequency)
}

/// Samples per access unit for the given initialization data.
///
/// Missing or unparsable configs fall back to the AAC-LC frame size.
pub fn samples_per_frame(audio_specific_config: Option<&[u8]>) -> u32 {
    audio_specific_config
        .and_then(|data| AudioSpecificConfig::parse(data).ok())
        .map_or(AAC_LC_SAMPLES_PER_FRAME, |config| config.samples_per_frame())
}

/// Duration of one access unit in microseconds, or `None` when the sample
/// rate is unknown.
pub fn frame_duration_us(samples_per_frame: u32, sample_rate: u32) -> Option<i64> {
    if sample_rate == 0 {
        return None;
    }
    Some(1_000_000i64 * samples_per_frame as i64 / sample_rate as i64)
}
