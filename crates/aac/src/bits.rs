use crate::AacError;

/// MSB-first bit reader over a byte slice.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads up to 32 bits.
    pub(crate) fn read_bits(&mut self, count: u32) -> Result<u32, AacError> {
        debug_assert!(count <= 32);
        if self.pos + count as usize > self.data.len() * 8 {
            return Err(AacError::Truncated {
                bits_read: self.pos,
            });
        }

        let mut value = 0u32;
        for _ in 0..count {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            value = (value << 1) | bit as u32;
            self.pos += 1;
        }
        Ok(value)
    }

    pub(crate) fn read_u8(&mut self, count: u32) -> Result<u8, AacError> {
        debug_assert!(count <= 8);
        self.read_bits(count).map(|v| v as u8)
    }
}
