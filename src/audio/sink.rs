// Audio sink abstraction
// The scheduler talks to the output through these traits so tests can swap in a fake device

use std::sync::Arc;

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::warn;

use crate::audio::decoder::SampleBuffer;
use crate::error::SinkError;

/// Pending "ended" notifications; drained on every scheduler call
const ENDED_QUEUE_CAPACITY: usize = 16;

/// Identifies one play-through of one loaded buffer
///
/// `generation` moves on every load/dispose, `connection` on every new output
/// connection. Anything scheduled with an older token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackToken {
    pub generation: u64,
    pub connection: u64,
}

/// Single-use output connection for a sample buffer
pub trait Connection {
    /// Begin playback `offset_seconds` into the buffer
    fn start(&mut self, offset_seconds: f64) -> Result<(), SinkError>;

    /// Stop and disconnect. Must not fire the ended notifier.
    fn stop(&mut self);
}

/// Platform audio output
pub trait AudioSink {
    type Connection: Connection;

    /// Make sure the output is running (it may have been suspended by the host)
    fn resume(&mut self) -> Result<(), SinkError>;

    /// Create a fresh connection for `buffer`. `notifier` fires once if the
    /// connection plays through to the end of the buffer.
    fn connect(
        &mut self,
        buffer: Arc<SampleBuffer>,
        notifier: EndedNotifier,
    ) -> Result<Self::Connection, SinkError>;
}

/// Handle given to a connection so it can report that it ran out of samples
///
/// Safe to move onto the audio thread.
#[derive(Clone)]
pub struct EndedNotifier {
    token: PlaybackToken,
    producer: Arc<Mutex<HeapProd<PlaybackToken>>>,
}

impl EndedNotifier {
    pub fn token(&self) -> PlaybackToken {
        self.token
    }

    pub fn notify(&self) {
        if self.producer.lock().try_push(self.token).is_err() {
            // Polling still catches the end of the buffer
            warn!(token = ?self.token, "ended queue full, dropping notification");
        }
    }
}

/// Receiving end of the ended notifications
pub(crate) struct EndedQueue {
    producer: Arc<Mutex<HeapProd<PlaybackToken>>>,
    consumer: HeapCons<PlaybackToken>,
}

impl EndedQueue {
    pub(crate) fn new() -> Self {
        let (producer, consumer) = HeapRb::<PlaybackToken>::new(ENDED_QUEUE_CAPACITY).split();
        Self {
            producer: Arc::new(Mutex::new(producer)),
            consumer,
        }
    }

    pub(crate) fn notifier(&self, token: PlaybackToken) -> EndedNotifier {
        EndedNotifier {
            token,
            producer: Arc::clone(&self.producer),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<PlaybackToken> {
        self.consumer.try_pop()
    }
}
