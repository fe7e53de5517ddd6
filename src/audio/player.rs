// Playback scheduler
// Owns the decoded buffer, the play/pause state machine and the clock bookkeeping

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::clock::HostClock;
use crate::audio::decoder::{self, SampleBuffer};
use crate::audio::sink::{AudioSink, Connection, EndedQueue, PlaybackToken};
use crate::error::{DecodeError, PlaybackError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Ready,
    Playing,
    Paused,
    Finished,
}

/// Recurring progress check, live only while its token is current
#[derive(Debug, Clone, Copy)]
struct ProgressTask {
    token: PlaybackToken,
}

/// Play/pause state machine driven by a host clock
///
/// Elapsed time while playing is `now - start_clock_time + paused_offset`; no
/// per-frame counter is kept. Completion can be reported by the sink (ended
/// notification) or noticed by `tick`, whichever comes first; the other one is
/// discarded by the token check.
///
/// All calls are expected from one thread.
pub struct PlaybackScheduler<C: HostClock, S: AudioSink> {
    clock: C,
    sink: S,
    buffer: Option<Arc<SampleBuffer>>,
    state: PlaybackState,
    paused_offset: f64,
    start_clock_time: f64,
    connection: Option<S::Connection>,
    token: PlaybackToken,
    progress_task: Option<ProgressTask>,
    ended: EndedQueue,
}

impl<C: HostClock, S: AudioSink> PlaybackScheduler<C, S> {
    pub fn new(clock: C, sink: S) -> Self {
        Self {
            clock,
            sink,
            buffer: None,
            state: PlaybackState::Idle,
            paused_offset: 0.0,
            start_clock_time: 0.0,
            connection: None,
            token: PlaybackToken::default(),
            progress_task: None,
            ended: EndedQueue::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The loaded buffer, if any
    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_deref()
    }

    /// Duration of the loaded buffer, 0 when nothing is loaded
    pub fn duration_seconds(&self) -> f64 {
        self.buffer.as_ref().map_or(0.0, |b| b.duration_seconds())
    }

    /// Time played before the current run started (or before the pause)
    pub fn paused_offset_seconds(&self) -> f64 {
        self.paused_offset
    }

    /// Bumped on every load and dispose
    pub fn generation(&self) -> u64 {
        self.token.generation
    }

    /// Played time, clamped to the buffer duration
    pub fn elapsed_seconds(&self) -> f64 {
        match self.state {
            PlaybackState::Idle | PlaybackState::Ready => 0.0,
            PlaybackState::Paused => self.paused_offset,
            PlaybackState::Playing => self.raw_elapsed().clamp(0.0, self.duration_seconds()),
            PlaybackState::Finished => self.duration_seconds(),
        }
    }

    /// Progress as a percentage in [0, 100]
    pub fn progress(&self) -> f64 {
        match self.state {
            PlaybackState::Idle | PlaybackState::Ready => 0.0,
            PlaybackState::Finished => 100.0,
            PlaybackState::Playing | PlaybackState::Paused => {
                let duration = self.duration_seconds();
                if duration <= 0.0 {
                    return 0.0;
                }
                (100.0 * self.elapsed_seconds() / duration).clamp(0.0, 100.0)
            }
        }
    }

    /// Decode `payload` and make it the current buffer
    ///
    /// On failure nothing changes: the previous buffer and state stay in place.
    pub fn load(&mut self, payload: &str) -> Result<(), DecodeError> {
        let buffer = decoder::decode(payload).map_err(|e| {
            warn!(error = %e, state = ?self.state, "failed to load narration audio");
            e
        })?;
        self.load_buffer(buffer);
        Ok(())
    }

    /// Replace the current buffer with an already decoded one
    pub fn load_buffer(&mut self, buffer: SampleBuffer) {
        self.stop_output();
        self.discard_ended();

        self.token = PlaybackToken {
            generation: self.token.generation + 1,
            connection: 0,
        };
        self.buffer = Some(Arc::new(buffer));
        self.paused_offset = 0.0;
        self.start_clock_time = 0.0;
        self.state = PlaybackState::Ready;

        info!(
            generation = self.token.generation,
            duration = self.duration_seconds(),
            "narration audio loaded"
        );
    }

    /// Start or resume playback
    ///
    /// Already playing: no-op. Finished: no-op until the next load.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.process_ended();

        match self.state {
            PlaybackState::Idle => return Err(PlaybackError::NotLoaded),
            PlaybackState::Playing => {
                debug!("play ignored, already playing");
                return Ok(());
            }
            PlaybackState::Finished => {
                debug!("play ignored, playback finished");
                return Ok(());
            }
            PlaybackState::Ready | PlaybackState::Paused => {}
        }

        let buffer = match &self.buffer {
            Some(buffer) => Arc::clone(buffer),
            None => return Err(PlaybackError::NotLoaded),
        };

        if self.paused_offset >= buffer.duration_seconds() {
            self.finish();
            return Ok(());
        }

        self.sink.resume()?;

        // Each connection gets its own token so a late ended event from a
        // stopped one can't finish the next run
        self.token.connection += 1;
        let notifier = self.ended.notifier(self.token);
        let mut connection = self.sink.connect(buffer, notifier)?;
        if let Err(e) = connection.start(self.paused_offset) {
            connection.stop();
            return Err(e.into());
        }

        self.start_clock_time = self.clock.now();
        self.connection = Some(connection);
        self.progress_task = Some(ProgressTask { token: self.token });
        self.state = PlaybackState::Playing;

        info!(offset = self.paused_offset, "playback started");
        Ok(())
    }

    /// Pause playback, keeping the position. Ignored unless playing.
    pub fn pause(&mut self) {
        self.process_ended();

        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "pause ignored, not playing");
            return;
        }

        let offset = self.paused_offset + (self.clock.now() - self.start_clock_time).max(0.0);
        if offset >= self.duration_seconds() {
            self.finish();
            return;
        }

        self.paused_offset = offset;
        self.stop_output();
        self.state = PlaybackState::Paused;

        info!(offset = self.paused_offset, "playback paused");
    }

    /// Pause when playing, play otherwise
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Run one step of the progress task
    ///
    /// Returns `None` when no task is live (not playing, or cancelled by a
    /// pause/load/dispose). Returns `Some(100.0)` on the step that finishes
    /// playback.
    pub fn tick(&mut self) -> Option<f64> {
        if self.process_ended() {
            return Some(100.0);
        }

        let task = self.progress_task?;
        if task.token != self.token || self.state != PlaybackState::Playing {
            self.progress_task = None;
            return None;
        }

        if self.raw_elapsed() >= self.duration_seconds() {
            self.finish();
            return Some(100.0);
        }

        Some(self.progress())
    }

    /// Stop output and drop the buffer. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.stop_output();
        self.discard_ended();

        if self.buffer.take().is_some() {
            self.token = PlaybackToken {
                generation: self.token.generation + 1,
                connection: 0,
            };
            debug!(generation = self.token.generation, "scheduler disposed");
        }
        self.paused_offset = 0.0;
        self.start_clock_time = 0.0;
        self.state = PlaybackState::Idle;
    }

    fn raw_elapsed(&self) -> f64 {
        self.clock.now() - self.start_clock_time + self.paused_offset
    }

    /// Apply pending ended notifications. True if one finished playback.
    fn process_ended(&mut self) -> bool {
        let mut finished = false;
        while let Some(token) = self.ended.pop() {
            if token == self.token && self.state == PlaybackState::Playing {
                finished = true;
                self.finish();
            } else {
                debug!(?token, current = ?self.token, "stale ended notification ignored");
            }
        }
        finished
    }

    fn discard_ended(&mut self) {
        while self.ended.pop().is_some() {}
    }

    fn finish(&mut self) {
        self.stop_output();
        self.paused_offset = self.duration_seconds();
        self.state = PlaybackState::Finished;
        info!("playback finished");
    }

    /// Stop the live connection and cancel the progress task
    fn stop_output(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.stop();
        }
        self.progress_task = None;
    }
}

impl<C: HostClock, S: AudioSink> Drop for PlaybackScheduler<C, S> {
    fn drop(&mut self) {
        self.stop_output();
    }
}
