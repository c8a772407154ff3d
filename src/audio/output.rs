use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use log::{debug, error};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use super::device::DeviceManager;
use super::{AudioOutput, EndedSignal, OutputGraph, StreamClock};
use crate::error::AudioError;
use crate::models::SampleBuffer;

/// Audio output on a cpal device.
///
/// Every connected graph owns its own stream, built on a dedicated
/// `audio-output` thread because streams cannot move between threads on
/// every host.
pub struct CpalOutput {
    device: Device,
    device_name: String,
    clock: StreamClock,
}

impl CpalOutput {
    pub fn new(device: Device) -> Result<Self, AudioError> {
        let device_name = device
            .name()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to get device name: {}", e)))?;
        Ok(Self {
            device,
            device_name,
            clock: StreamClock::new(),
        })
    }

    /// Open the preferred device, falling back to the system default
    pub fn open(preferred_device: Option<&str>) -> Result<Self, AudioError> {
        let mut manager = DeviceManager::new()?;
        manager.select_device_with_fallback(preferred_device)?;
        let device = manager
            .current_device()
            .cloned()
            .ok_or_else(|| AudioError::InitializationFailed("No device selected".to_string()))?;
        Self::new(device)
    }
}

impl AudioOutput for CpalOutput {
    fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.clock.resume();
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.clock.suspend();
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AudioError> {
        self.clock.reset();
        Ok(())
    }

    fn connect(
        &mut self,
        buffer: Arc<SampleBuffer>,
        start_at: f64,
        gain: f32,
        on_ended: EndedSignal,
    ) -> Result<Box<dyn OutputGraph>, AudioError> {
        let graph = CpalGraph::spawn(&self.device, buffer, start_at, gain, on_ended)?;
        Ok(Box::new(graph))
    }

    fn device_name(&self) -> Option<String> {
        Some(self.device_name.clone())
    }
}

struct CpalGraph {
    gain: Arc<AtomicU32>, // f32 bits
    stop: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CpalGraph {
    fn spawn(
        device: &Device,
        buffer: Arc<SampleBuffer>,
        start_at: f64,
        gain: f32,
        on_ended: EndedSignal,
    ) -> Result<Self, AudioError> {
        let device = device.clone();
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to get default config: {}", e)))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();

        if config.sample_rate.0 != buffer.sample_rate() {
            debug!(
                "Resampling {} Hz buffer to {} Hz device",
                buffer.sample_rate(),
                config.sample_rate.0
            );
        }
        let cursor = SourceCursor::new(buffer, start_at, config.sample_rate.0);

        let gain = Arc::new(AtomicU32::new(gain.to_bits()));
        let stream_gain = Arc::clone(&gain);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream_result = match sample_format {
                    SampleFormat::F32 => build_stream::<f32>(&device, &config, cursor, stream_gain, on_ended),
                    SampleFormat::I16 => build_stream::<i16>(&device, &config, cursor, stream_gain, on_ended),
                    SampleFormat::U16 => build_stream::<u16>(&device, &config, cursor, stream_gain, on_ended),
                    other => Err(AudioError::UnsupportedFormat {
                        format: format!("{:?}", other),
                    }),
                };

                let stream = match stream_result.and_then(|stream| {
                    stream
                        .play()
                        .map_err(|e| AudioError::StreamError(format!("Failed to start audio stream: {}", e)))?;
                    Ok(stream)
                }) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Runs until disconnect or until the graph is dropped
                let _ = stop_rx.recv();
                let _ = stream.pause();
            })
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to create audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                gain,
                stop: Some(stop_tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::StreamError(
                    "Audio thread exited before the stream started".to_string(),
                ))
            }
        }
    }
}

impl OutputGraph for CpalGraph {
    fn set_gain(&mut self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn disconnect(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut cursor: SourceCursor,
    gain: Arc<AtomicU32>,
    on_ended: EndedSignal,
) -> Result<Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let current_gain = f32::from_bits(gain.load(Ordering::Relaxed));
                for frame in data.chunks_mut(channels) {
                    cursor.write_frame(frame, current_gain);
                }
                if cursor.is_finished() {
                    on_ended.fire();
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("Failed to build output stream: {}", e)))
}

/// Read position inside a buffer, stepping at the device rate
pub(crate) struct SourceCursor {
    buffer: Arc<SampleBuffer>,
    /// Fractional frame index into the buffer
    position: f64,
    step: f64,
}

impl SourceCursor {
    pub(crate) fn new(buffer: Arc<SampleBuffer>, start_at: f64, device_rate: u32) -> Self {
        let buffer_rate = buffer.sample_rate() as f64;
        let step = if device_rate > 0 {
            buffer_rate / device_rate as f64
        } else {
            1.0
        };
        Self {
            position: start_at.max(0.0) * buffer_rate,
            buffer,
            step,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.position >= self.buffer.frames() as f64
    }

    /// Fill one output frame and advance; silence once the buffer is exhausted
    pub(crate) fn write_frame<T>(&mut self, frame: &mut [T], gain: f32)
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        if self.is_finished() || self.buffer.channels() == 0 {
            for out in frame.iter_mut() {
                *out = T::from_sample(0.0f32);
            }
            return;
        }

        let last_channel = self.buffer.channels() as usize - 1;
        for (channel, out) in frame.iter_mut().enumerate() {
            let value = self.interpolate(channel.min(last_channel)) * gain;
            *out = T::from_sample(value);
        }
        self.position += self.step;
    }

    fn interpolate(&self, channel: usize) -> f32 {
        let index = self.position.floor();
        let fraction = (self.position - index) as f32;
        let index = index as usize;

        let current = self.buffer.sample(index, channel);
        if fraction == 0.0 || index + 1 >= self.buffer.frames() {
            return current;
        }
        let next = self.buffer.sample(index + 1, channel);
        current + (next - current) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(sample_rate: u32, channels: u16, frames: usize) -> Arc<SampleBuffer> {
        let samples = (0..frames)
            .flat_map(|f| std::iter::repeat(f as f32 / frames as f32).take(channels as usize))
            .collect();
        Arc::new(SampleBuffer::new(sample_rate, channels, samples))
    }

    #[test]
    fn test_cursor_plays_through_at_matching_rate() {
        let mut cursor = SourceCursor::new(ramp(100, 2, 4), 0.0, 100);
        let mut frame = [0.0f32; 2];

        for expected in [0.0, 0.25, 0.5, 0.75] {
            assert!(!cursor.is_finished());
            cursor.write_frame(&mut frame, 1.0);
            assert_eq!(frame, [expected, expected]);
        }
        assert!(cursor.is_finished());

        cursor.write_frame(&mut frame, 1.0);
        assert_eq!(frame, [0.0, 0.0]);
    }

    #[test]
    fn test_cursor_interpolates_when_device_is_faster() {
        // 2x device rate: every other output frame falls between two samples
        let mut cursor = SourceCursor::new(ramp(100, 1, 4), 0.0, 200);
        let mut frame = [0.0f32; 1];
        let mut written = Vec::new();
        while !cursor.is_finished() {
            cursor.write_frame(&mut frame, 1.0);
            written.push(frame[0]);
        }
        assert_eq!(written, vec![0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.75]);
    }

    #[test]
    fn test_cursor_starts_at_offset_and_applies_gain() {
        let mut cursor = SourceCursor::new(ramp(4, 1, 4), 0.5, 4);
        let mut frame = [0.0f32; 2];

        // Mono source is duplicated across device channels
        cursor.write_frame(&mut frame, 0.5);
        assert_eq!(frame, [0.25, 0.25]);
    }

    #[test]
    fn test_cursor_past_end_is_finished() {
        let cursor = SourceCursor::new(ramp(10, 1, 10), 5.0, 10);
        assert!(cursor.is_finished());
    }
}
