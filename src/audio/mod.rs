pub mod clock;
pub mod decoder;
pub mod device;
pub mod engine;
pub mod output;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use crate::error::{AudioError, DecodeError};
use crate::models::SampleBuffer;

pub use clock::StreamClock;
pub use decoder::{FormatHint, SymphoniaDecoder};
pub use device::{DeviceCapabilities, DeviceManager};
pub use engine::{
    ClockState, EndedSignal, EngineEvent, EngineEventLoop, GraphId, PlaybackEngine, PlaybackNotification,
};
pub use output::CpalOutput;

/// Real-time audio output with a suspendable clock.
///
/// The clock reported by [`AudioOutput::current_time`] advances only between
/// `resume` and `suspend`, and `reset` returns it to zero.
pub trait AudioOutput: Send {
    /// Output clock in seconds
    fn current_time(&self) -> f64;

    fn resume(&mut self) -> Result<(), AudioError>;

    fn suspend(&mut self) -> Result<(), AudioError>;

    /// Drop every graph and rewind the clock to zero, suspended
    fn reset(&mut self) -> Result<(), AudioError>;

    /// Build a gain stage and a one-shot source bound to `buffer`, starting
    /// playback `start_at` seconds into the buffer. `on_ended` fires once when
    /// the source runs out of samples.
    fn connect(
        &mut self,
        buffer: Arc<SampleBuffer>,
        start_at: f64,
        gain: f32,
        on_ended: EndedSignal,
    ) -> Result<Box<dyn OutputGraph>, AudioError>;

    /// Name of the device frames are written to, if any
    fn device_name(&self) -> Option<String> {
        None
    }
}

/// A connected source + gain stage
pub trait OutputGraph: Send {
    fn set_gain(&mut self, gain: f32);

    /// Stop the source and release the graph; later calls do nothing
    fn disconnect(&mut self);
}

/// Turns encoded file bytes into interleaved PCM
pub trait SampleDecoder: Send + Sync {
    fn decode_samples(&self, bytes: Vec<u8>, hint: &FormatHint) -> Result<SampleBuffer, DecodeError>;
}
