// Sample rate conversion for device output
// Narration is 24 kHz; most devices run at 44.1 or 48 kHz

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::error::SinkError;

/// Input frames per resampler chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Resample a whole mono buffer from `from_rate` to `to_rate`
///
/// The output is trimmed of the resampler delay, so it lines up with the input
/// and has `len * to_rate / from_rate` samples.
pub fn resample_mono(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
    chunk_size: usize,
) -> Result<Vec<f32>, SinkError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        chunk_size.max(1),
        2,
        1,
    )
    .map_err(|e| SinkError::Connection(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + chunk_size);
    let mut position = 0;

    while samples.len() - position >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk = [&samples[position..position + needed]];
        let out = resampler
            .process(&chunk[..], None)
            .map_err(|e| SinkError::Connection(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
        position += needed;
    }

    if position < samples.len() {
        let chunk = [&samples[position..]];
        let out = resampler
            .process_partial(Some(&chunk[..]), None)
            .map_err(|e| SinkError::Connection(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush whatever is still inside the filter
    while output.len() < expected + delay {
        let out = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| SinkError::Connection(format!("Resampling failed: {}", e)))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);

    debug!(from_rate, to_rate, input = samples.len(), output = output.len(), "resampled buffer");
    Ok(output)
}
