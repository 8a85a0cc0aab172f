//! EMG Frame Decoder
//!
//! Turns one notification payload into a [`Sample`].

use crate::domain::error::FrameError;

/// Exact size of one telemetry frame in bytes
pub const FRAME_LEN: usize = 24;

/// One decoded telemetry frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Device-side timestamp, units defined by the firmware
    pub timestamp: i32,
    /// Raw EMG channel readings
    pub emg: [i32; 3],
    /// Filtered motion axes
    pub kal: [i32; 2],
}

/// Decode a 24-byte frame
///
/// # Frame Structure (24 bytes, all little-endian i32)
///
/// ```text
/// [0-3]   : Timestamp
/// [4-7]   : EMG channel 0
/// [8-11]  : EMG channel 1
/// [12-15] : EMG channel 2
/// [16-19] : Kal axis 0 (horizontal)
/// [20-23] : Kal axis 1 (vertical)
/// ```
pub fn decode_frame(bytes: &[u8]) -> Result<Sample, FrameError> {
    let bytes: &[u8; FRAME_LEN] = bytes.try_into().map_err(|_| FrameError::MalformedFrame {
        expected: FRAME_LEN,
        actual: bytes.len(),
    })?;

    let word = |index: usize| {
        let at = index * 4;
        i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };

    Ok(Sample {
        timestamp: word(0),
        emg: [word(1), word(2), word(3)],
        kal: [word(4), word(5)],
    })
}

/// Encode a sample into its wire layout. Used by simulated devices and tests.
pub fn encode_frame(sample: &Sample) -> [u8; FRAME_LEN] {
    let mut out = [0u8; FRAME_LEN];
    let words = [
        sample.timestamp,
        sample.emg[0],
        sample.emg[1],
        sample.emg[2],
        sample.kal[0],
        sample.kal[1],
    ];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}
