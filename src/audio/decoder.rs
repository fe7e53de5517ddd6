// PCM decoder
// Turns a base64 payload of raw 16-bit little-endian mono PCM into normalized f32 samples

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::debug;

use crate::error::DecodeError;

/// Sample rate of every narration payload
pub const SAMPLE_RATE: u32 = 24_000;

/// Narration payloads are always mono
pub const CHANNEL_COUNT: u16 = 1;

/// Divisor for i16 -> f32. Applied to both signs, so 32767 lands just under 1.0
/// and -32768 lands exactly on -1.0. Reference audio depends on this.
const I16_SCALE: f32 = 1.0 / 32768.0;

/// Standard alphabet, padding accepted but not required
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded narration audio
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channel_count: u16,
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Wrap already-normalized mono samples at the narration rate
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channel_count: CHANNEL_COUNT,
            samples,
        }
    }

    /// Get the sample rate of the audio
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of channels
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the buffer in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a base64 payload into a sample buffer
///
/// ASCII whitespace anywhere in the payload is skipped, the same way a browser's
/// `atob` treats it. A final unpaired byte is dropped without error.
pub fn decode(payload: &str) -> Result<SampleBuffer, DecodeError> {
    let payload = strip_whitespace(payload);
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let raw = PAYLOAD_ENGINE.decode(payload.as_bytes())?;
    decode_bytes(&raw)
}

/// Interpret raw bytes as little-endian i16 samples
pub fn decode_bytes(raw: &[u8]) -> Result<SampleBuffer, DecodeError> {
    if raw.len() < 2 {
        return Err(DecodeError::NoSamples(raw.len()));
    }

    let samples: Vec<f32> = raw
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 * I16_SCALE)
        .collect();

    let buffer = SampleBuffer::from_samples(samples);
    debug!(
        bytes = raw.len(),
        samples = buffer.len(),
        duration = buffer.duration_seconds(),
        "decoded narration payload"
    );
    Ok(buffer)
}

/// Run `decode` on the blocking pool so large payloads don't stall the caller
pub async fn decode_offloaded(payload: String) -> Result<SampleBuffer, DecodeError> {
    tokio::task::spawn_blocking(move || decode(&payload))
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))?
}

fn strip_whitespace(payload: &str) -> Cow<'_, str> {
    if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(payload.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    fn encode_samples(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_sample_count_is_half_byte_length() {
        let bytes = vec![0u8; 480];
        let buffer = decode(&STANDARD.encode(&bytes)).unwrap();
        assert_eq!(buffer.len(), 240);
        assert_eq!(buffer.sample_rate(), 24_000);
        assert_eq!(buffer.channel_count(), 1);
    }

    #[test]
    fn test_odd_trailing_byte_dropped() {
        let bytes = [0x00u8, 0x40, 0x00, 0xC0, 0x7F];
        let buffer = decode(&STANDARD.encode(bytes)).unwrap();
        assert_eq!(buffer.samples(), &[0.5f32, -0.5f32]);
    }

    #[test]
    fn test_asymmetric_normalization() {
        let buffer = decode(&encode_samples(&[i16::MAX, i16::MIN, 0])).unwrap();
        let samples = buffer.samples();
        assert!(samples[0] < 1.0);
        assert_eq!(samples[0], 32767.0 / 32768.0);
        assert_eq!(samples[1], -1.0);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn test_samples_stay_in_range() {
        let input: Vec<i16> = (i16::MIN..=i16::MAX).step_by(97).collect();
        let buffer = decode(&encode_samples(&input)).unwrap();
        assert_eq!(buffer.len(), input.len());
        assert!(buffer.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_little_endian_order() {
        // 0x0100 little-endian is 256
        let buffer = decode(&STANDARD.encode([0x00u8, 0x01])).unwrap();
        assert_eq!(buffer.samples()[0], 256.0 / 32768.0);
    }

    #[test]
    fn test_duration_from_sample_count() {
        let buffer = SampleBuffer::from_samples(vec![0.0; 48_000]);
        assert!((buffer.duration_seconds() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_padding_optional() {
        let bytes = [1u8, 2, 3, 4];
        let padded = decode(&STANDARD.encode(bytes)).unwrap();
        let unpadded = decode(&STANDARD_NO_PAD.encode(bytes)).unwrap();
        assert_eq!(padded, unpadded);
    }

    #[test]
    fn test_whitespace_ignored() {
        let encoded = encode_samples(&[100, -100, 200, -200]);
        let (head, tail) = encoded.split_at(4);
        let wrapped = format!(" {}\n{}\r\n", head, tail);
        assert_eq!(decode(&wrapped).unwrap(), decode(&encoded).unwrap());
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(decode(""), Err(DecodeError::Empty)));
        assert!(matches!(decode("  \n"), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(decode("not*base64!"), Err(DecodeError::InvalidBase64(_))));
        assert!(matches!(decode("-_-_"), Err(DecodeError::InvalidBase64(_))));
    }

    #[test]
    fn test_single_byte_has_no_samples() {
        assert!(matches!(decode(&STANDARD.encode([7u8])), Err(DecodeError::NoSamples(1))));
    }

    #[tokio::test]
    async fn test_decode_offloaded_matches_inline() {
        let payload = encode_samples(&[1, 2, 3, -4]);
        let offloaded = decode_offloaded(payload.clone()).await.unwrap();
        assert_eq!(offloaded, decode(&payload).unwrap());
    }

    #[tokio::test]
    async fn test_decode_offloaded_reports_errors() {
        let result = decode_offloaded(String::new()).await;
        assert!(matches!(result, Err(DecodeError::Empty)));
    }
}
