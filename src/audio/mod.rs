// Audio playback module
// PCM decoding, playback scheduling and (behind the `output` feature) cpal output

pub mod clock;
pub mod decoder;
#[cfg(feature = "output")]
pub mod output;
pub mod player;
pub mod resample;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{HostClock, MonotonicClock};
pub use decoder::{decode, decode_bytes, decode_offloaded, SampleBuffer, CHANNEL_COUNT, SAMPLE_RATE};
pub use player::{PlaybackScheduler, PlaybackState};
pub use sink::{AudioSink, Connection, EndedNotifier, PlaybackToken};
