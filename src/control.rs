// Player control surface for the UI
// Single play/pause toggle, progress bar state and time labels

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::audio::clock::HostClock;
use crate::audio::decoder::decode_offloaded;
use crate::audio::player::{PlaybackScheduler, PlaybackState};
use crate::audio::sink::AudioSink;
use crate::error::{DecodeError, PlaybackError};
use crate::settings::PlaybackSettings;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStateResponse {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub progress: f64,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
    pub time_label: String,
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let minutes = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, secs)
}

pub struct AudioPlayerControl<C: HostClock, S: AudioSink> {
    player: PlaybackScheduler<C, S>,
    settings: PlaybackSettings,
}

impl<C: HostClock, S: AudioSink> AudioPlayerControl<C, S> {
    pub fn new(clock: C, sink: S, settings: PlaybackSettings) -> Self {
        Self {
            player: PlaybackScheduler::new(clock, sink),
            settings,
        }
    }

    pub fn player(&self) -> &PlaybackScheduler<C, S> {
        &self.player
    }

    pub fn load(&mut self, payload: &str) -> Result<(), DecodeError> {
        self.player.load(payload)
    }

    /// Decode on the blocking pool, then swap the buffer in
    pub async fn load_offloaded(&mut self, payload: String) -> Result<(), DecodeError> {
        let buffer = decode_offloaded(payload).await?;
        self.player.load_buffer(buffer);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<PlayerStateResponse, PlaybackError> {
        self.player.toggle()?;
        Ok(self.state_response())
    }

    pub fn dispose(&mut self) {
        self.player.dispose();
    }

    pub fn state_response(&self) -> PlayerStateResponse {
        let elapsed = self.player.elapsed_seconds();
        let duration = self.player.duration_seconds();

        PlayerStateResponse {
            state: self.player.state(),
            is_playing: self.player.state() == PlaybackState::Playing,
            progress: self.player.progress(),
            elapsed_seconds: elapsed,
            duration_seconds: duration,
            time_label: format!("{} / {}", format_time(elapsed), format_time(duration)),
        }
    }

    /// Poll progress at the configured interval until the progress task stops
    ///
    /// Returns once playback is paused, finished, reloaded or disposed. The
    /// last update of a play-through that ran to the end reports 100.
    pub async fn follow_progress<F>(&mut self, mut on_update: F)
    where
        F: FnMut(&PlayerStateResponse),
    {
        let mut interval = tokio::time::interval(self.settings.progress_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match self.player.tick() {
                Some(_) => on_update(&self.state_response()),
                None => break,
            }
        }
    }
}
