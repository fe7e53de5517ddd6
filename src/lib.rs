// Story Audio - narration playback core
// Decodes base64 PCM narration and drives play/pause/progress against a host clock

pub mod audio;
pub mod control;
pub mod error;
pub mod settings;

pub use audio::{
    decode, AudioSink, Connection, HostClock, MonotonicClock, PlaybackScheduler, PlaybackState,
    SampleBuffer,
};
pub use control::{format_time, AudioPlayerControl, PlayerStateResponse};
pub use error::{DecodeError, PlaybackError, SinkError};
pub use settings::PlayerSettings;

#[cfg(feature = "output")]
pub use audio::output::CpalSink;

/// Player wired to the default output device and the wall clock
#[cfg(feature = "output")]
pub type DevicePlayer = AudioPlayerControl<MonotonicClock, CpalSink>;

/// Open the default output device with the given settings
#[cfg(feature = "output")]
pub fn open_device_player(settings: &PlayerSettings) -> Result<DevicePlayer, SinkError> {
    let sink = CpalSink::open(&settings.output)?;
    Ok(AudioPlayerControl::new(
        MonotonicClock::new(),
        sink,
        settings.playback.clone(),
    ))
}
