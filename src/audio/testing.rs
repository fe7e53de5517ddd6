// Deterministic clock and sink for scheduler tests
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::audio::clock::HostClock;
use crate::audio::decoder::{SampleBuffer, SAMPLE_RATE};
use crate::audio::sink::{AudioSink, Connection, EndedNotifier};
use crate::error::SinkError;

/// Silent payload of the given length
pub(crate) fn silent_payload(seconds: f64) -> String {
    let samples = (seconds * SAMPLE_RATE as f64).round() as usize;
    STANDARD.encode(vec![0u8; samples * 2])
}

#[derive(Clone, Default)]
pub(crate) struct FakeClock(Rc<Cell<f64>>);

impl FakeClock {
    pub(crate) fn advance(&self, seconds: f64) {
        self.0.set(self.0.get() + seconds);
    }
}

impl HostClock for FakeClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Default)]
pub(crate) struct SinkLog {
    pub resumes: usize,
    pub connections: usize,
    pub starts: Vec<f64>,
    pub stops: usize,
    pub live: usize,
    pub notifiers: Vec<EndedNotifier>,
    pub fail_resume: bool,
    pub fail_start: bool,
}

impl SinkLog {
    /// Fire the ended notifier of the most recent connection
    pub(crate) fn end_latest(&self) {
        if let Some(notifier) = self.notifiers.last() {
            notifier.notify();
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeSink {
    pub log: Rc<RefCell<SinkLog>>,
}

pub(crate) struct FakeConnection {
    log: Rc<RefCell<SinkLog>>,
    started: bool,
    stopped: bool,
}

impl Connection for FakeConnection {
    fn start(&mut self, offset_seconds: f64) -> Result<(), SinkError> {
        let mut log = self.log.borrow_mut();
        if log.fail_start {
            return Err(SinkError::Connection("start refused".to_string()));
        }
        log.starts.push(offset_seconds);
        log.live += 1;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.started && !self.stopped {
            let mut log = self.log.borrow_mut();
            log.stops += 1;
            log.live -= 1;
        }
        self.stopped = true;
    }
}

impl AudioSink for FakeSink {
    type Connection = FakeConnection;

    fn resume(&mut self) -> Result<(), SinkError> {
        let mut log = self.log.borrow_mut();
        if log.fail_resume {
            return Err(SinkError::Unavailable("autoplay blocked".to_string()));
        }
        log.resumes += 1;
        Ok(())
    }

    fn connect(
        &mut self,
        _buffer: Arc<SampleBuffer>,
        notifier: EndedNotifier,
    ) -> Result<FakeConnection, SinkError> {
        let mut log = self.log.borrow_mut();
        log.connections += 1;
        log.notifiers.push(notifier);
        Ok(FakeConnection {
            log: Rc::clone(&self.log),
            started: false,
            stopped: false,
        })
    }
}
