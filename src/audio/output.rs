// Audio output using cpal
// Plays one narration buffer at a time on the default device

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

use crate::audio::decoder::SampleBuffer;
use crate::audio::resample::resample_mono;
use crate::audio::sink::{AudioSink, Connection, EndedNotifier};
use crate::error::SinkError;
use crate::settings::OutputSettings;

/// Buffer currently feeding the stream
struct Voice {
    id: u64,
    samples: Arc<Vec<f32>>,
    position: usize,
    notifier: EndedNotifier,
}

type VoiceSlot = Arc<Mutex<Option<Voice>>>;

pub struct CpalSink {
    stream: Stream,
    voice: VoiceSlot,
    sample_rate: u32,
    channels: u16,
    volume: Arc<Mutex<f32>>,
    chunk_size: usize,
    // Last buffer resampled to the device rate, reused across pause/resume
    resampled: Option<(Arc<SampleBuffer>, Arc<Vec<f32>>)>,
    next_id: u64,
}

impl CpalSink {
    /// Open the default output device
    pub fn open(settings: &OutputSettings) -> Result<Self, SinkError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| SinkError::Unavailable("No output device available".to_string()))?;

        let config = device.default_output_config().map_err(|e| {
            SinkError::Unavailable(format!("Failed to get default output config: {}", e))
        })?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let voice: VoiceSlot = Arc::new(Mutex::new(None));
        let volume = Arc::new(Mutex::new(settings.volume.clamp(0.0, 1.0)));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config.into(),
                voice.clone(),
                volume.clone(),
            )?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config.into(),
                voice.clone(),
                volume.clone(),
            )?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config.into(),
                voice.clone(),
                volume.clone(),
            )?,
            format => {
                return Err(SinkError::Unavailable(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| SinkError::Unavailable(format!("Failed to start stream: {}", e)))?;

        info!(sample_rate, channels, "audio output opened");

        Ok(Self {
            stream,
            voice,
            sample_rate,
            channels,
            volume,
            chunk_size: settings.resampler_chunk_size,
            resampled: None,
            next_id: 0,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        voice: VoiceSlot,
        volume: Arc<Mutex<f32>>,
    ) -> Result<Stream, SinkError> {
        let channels = config.channels.max(1) as usize;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut slot = voice.lock();
                    let vol = *volume.lock();

                    for frame in data.chunks_mut(channels) {
                        let value = match slot.as_mut() {
                            Some(active) if active.position < active.samples.len() => {
                                let sample = active.samples[active.position];
                                active.position += 1;
                                sample * vol
                            }
                            _ => 0.0,
                        };
                        // Mono narration goes to every device channel
                        for sample in frame.iter_mut() {
                            *sample = T::from_sample(value);
                        }
                    }

                    let drained = slot
                        .as_ref()
                        .map_or(false, |active| active.position >= active.samples.len());
                    if drained {
                        if let Some(done) = slot.take() {
                            done.notifier.notify();
                        }
                    }
                },
                move |err| {
                    error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| SinkError::Unavailable(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Get the output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of output channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Set the output volume (0.0 to 1.0)
    pub fn set_volume(&self, vol: f32) {
        *self.volume.lock() = vol.clamp(0.0, 1.0);
    }

    /// Get the current volume
    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    fn device_samples(&mut self, buffer: &Arc<SampleBuffer>) -> Result<Arc<Vec<f32>>, SinkError> {
        if let Some((cached, samples)) = &self.resampled {
            if Arc::ptr_eq(cached, buffer) {
                return Ok(Arc::clone(samples));
            }
        }

        let samples = Arc::new(resample_mono(
            buffer.samples(),
            buffer.sample_rate(),
            self.sample_rate,
            self.chunk_size,
        )?);
        self.resampled = Some((Arc::clone(buffer), Arc::clone(&samples)));
        Ok(samples)
    }
}

impl AudioSink for CpalSink {
    type Connection = CpalConnection;

    fn resume(&mut self) -> Result<(), SinkError> {
        self.stream
            .play()
            .map_err(|e| SinkError::Unavailable(format!("Failed to resume stream: {}", e)))
    }

    fn connect(
        &mut self,
        buffer: Arc<SampleBuffer>,
        notifier: EndedNotifier,
    ) -> Result<CpalConnection, SinkError> {
        let samples = self.device_samples(&buffer)?;
        self.next_id += 1;

        Ok(CpalConnection {
            id: self.next_id,
            voice: Arc::clone(&self.voice),
            samples,
            sample_rate: self.sample_rate,
            notifier,
        })
    }
}

/// One play-through of a buffer on the cpal stream
pub struct CpalConnection {
    id: u64,
    voice: VoiceSlot,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    notifier: EndedNotifier,
}

impl Connection for CpalConnection {
    fn start(&mut self, offset_seconds: f64) -> Result<(), SinkError> {
        let position = ((offset_seconds.max(0.0) * self.sample_rate as f64).round() as usize)
            .min(self.samples.len());

        *self.voice.lock() = Some(Voice {
            id: self.id,
            samples: Arc::clone(&self.samples),
            position,
            notifier: self.notifier.clone(),
        });
        Ok(())
    }

    fn stop(&mut self) {
        let mut slot = self.voice.lock();
        if slot.as_ref().map_or(false, |active| active.id == self.id) {
            *slot = None;
        }
    }
}
