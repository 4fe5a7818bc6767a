//! Interleaved PCM conversion.

/// Sample encoding announced by `open` (`audio_format`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleEncoding {
    I8,
    I16,
    I32,
    F32,
}

impl SampleEncoding {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SampleEncoding::I8),
            1 => Some(SampleEncoding::I16),
            2 => Some(SampleEncoding::I32),
            3 => Some(SampleEncoding::F32),
            _ => None,
        }
    }

    /// Unknown codes fall back to 16-bit.
    pub fn from_code_or_default(code: i32) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            tracing::error!(code, "unsupported audio sample format; assuming i16");
            SampleEncoding::I16
        })
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::I8 => 1,
            SampleEncoding::I16 => 2,
            SampleEncoding::I32 | SampleEncoding::F32 => 4,
        }
    }

    /// Full-scale divisor mapping integer samples to `[-1, 1)`.
    fn max_value(self) -> f32 {
        match self {
            SampleEncoding::I8 => 128.0,
            SampleEncoding::I16 => 32_768.0,
            SampleEncoding::I32 => 2_147_483_648.0,
            SampleEncoding::F32 => 1.0,
        }
    }

    /// Decode little-endian samples; a trailing partial sample is ignored.
    pub fn to_f32(self, bytes: &[u8]) -> Vec<f32> {
        let max = self.max_value();
        let width = self.bytes_per_sample();
        bytes
            .chunks_exact(width)
            .map(|b| match self {
                SampleEncoding::I8 => f32::from(b[0] as i8) / max,
                SampleEncoding::I16 => f32::from(i16::from_le_bytes([b[0], b[1]])) / max,
                SampleEncoding::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / max,
                SampleEncoding::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            })
            .collect()
    }
}
