use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Environment variable that overrides the configured log level
pub const LOG_LEVEL_ENV: &str = "WAVEPLAY_LOG_LEVEL";

const DEFAULT_MAX_EVENTS: usize = 1000;

/// Loads slower than this are recorded as performance warnings
pub const SLOW_LOAD_THRESHOLD: Duration = Duration::from_secs(3);

/// Player event for logging and debugging
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: PlayerEventType,
    pub duration: Option<Duration>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEventType {
    TrackLoaded,
    MetadataSkipped,
    PlaybackStarted,
    PlaybackPaused,
    PlaybackStopped,
    SeekOperation,
    LoopToggled,
    VolumeChanged,
    DecodeError,
    StreamError,
    PerformanceWarning,
}

impl PlayerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerEventType::TrackLoaded => "TRACK_LOADED",
            PlayerEventType::MetadataSkipped => "METADATA_SKIPPED",
            PlayerEventType::PlaybackStarted => "PLAYBACK_STARTED",
            PlayerEventType::PlaybackPaused => "PLAYBACK_PAUSED",
            PlayerEventType::PlaybackStopped => "PLAYBACK_STOPPED",
            PlayerEventType::SeekOperation => "SEEK_OPERATION",
            PlayerEventType::LoopToggled => "LOOP_TOGGLED",
            PlayerEventType::VolumeChanged => "VOLUME_CHANGED",
            PlayerEventType::DecodeError => "DECODE_ERROR",
            PlayerEventType::StreamError => "STREAM_ERROR",
            PlayerEventType::PerformanceWarning => "PERFORMANCE_WARNING",
        }
    }
}

/// Bounded history of player events, mirrored to the `log` facade
#[derive(Clone)]
pub struct PlayerLogger {
    events: Arc<Mutex<VecDeque<PlayerEvent>>>,
    max_events: usize,
}

impl Default for PlayerLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerLogger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: max_events.max(1),
        }
    }

    /// Initialize `env_logger` at the level named by `WAVEPLAY_LOG_LEVEL`,
    /// or `default_level` when the variable is unset
    pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_level.to_string());

        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
        builder.filter_level(parse_level(&log_level));
        builder.try_init()?;

        info!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<PlayerEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log_event(&self, event_type: PlayerEventType, details: String, duration: Option<Duration>) {
        match event_type {
            PlayerEventType::TrackLoaded
            | PlayerEventType::PlaybackStarted
            | PlayerEventType::PlaybackPaused
            | PlayerEventType::PlaybackStopped => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            PlayerEventType::SeekOperation
            | PlayerEventType::LoopToggled
            | PlayerEventType::VolumeChanged => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            PlayerEventType::MetadataSkipped => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            PlayerEventType::DecodeError | PlayerEventType::StreamError => {
                error!("[{}] {}", event_type.as_str(), details);
            }
            PlayerEventType::PerformanceWarning => {
                warn!("[{}] {} (duration: {:?})", event_type.as_str(), details, duration);
            }
        }

        let mut events = self.events();
        events.push_back(PlayerEvent {
            timestamp: Utc::now(),
            event_type,
            duration,
            details,
        });
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    pub fn log_track_loaded(&self, file: &str, duration: Duration, load_time: Duration) {
        self.log_event(
            PlayerEventType::TrackLoaded,
            format!("Loaded '{}' ({:.2}s)", file, duration.as_secs_f64()),
            Some(load_time),
        );
        if load_time > SLOW_LOAD_THRESHOLD {
            self.log_performance_warning(&format!("load '{}'", file), load_time, SLOW_LOAD_THRESHOLD);
        }
    }

    pub fn log_metadata_skipped(&self, file: &str, reason: &str) {
        self.log_event(
            PlayerEventType::MetadataSkipped,
            format!("No tags read from '{}': {}", file, reason),
            None,
        );
    }

    pub fn log_playback_started(&self, position: f64) {
        self.log_event(
            PlayerEventType::PlaybackStarted,
            format!("Playback started at {:.2}s", position),
            None,
        );
    }

    pub fn log_playback_paused(&self, position: f64) {
        self.log_event(
            PlayerEventType::PlaybackPaused,
            format!("Playback paused at {:.2}s", position),
            None,
        );
    }

    pub fn log_playback_stopped(&self, reason: &str) {
        self.log_event(
            PlayerEventType::PlaybackStopped,
            format!("Playback stopped: {}", reason),
            None,
        );
    }

    pub fn log_seek_operation(&self, from: f64, to: f64) {
        self.log_event(
            PlayerEventType::SeekOperation,
            format!("Seek from {:.2}s to {:.2}s", from, to),
            None,
        );
    }

    pub fn log_loop_toggled(&self, enabled: bool) {
        self.log_event(
            PlayerEventType::LoopToggled,
            format!("Loop {}", if enabled { "enabled" } else { "disabled" }),
            None,
        );
    }

    pub fn log_volume_changed(&self, requested: f32, applied: f32) {
        let details = if requested == applied {
            format!("Volume set to {:.2}", applied)
        } else {
            format!("Volume {:.2} clamped to {:.2}", requested, applied)
        };
        self.log_event(PlayerEventType::VolumeChanged, details, None);
    }

    pub fn log_decode_error(&self, file: &str, error: &str) {
        self.log_event(
            PlayerEventType::DecodeError,
            format!("Decode error for '{}': {}", file, error),
            None,
        );
    }

    pub fn log_stream_error(&self, error: &str) {
        self.log_event(PlayerEventType::StreamError, format!("Stream error: {}", error), None);
    }

    pub fn log_performance_warning(&self, operation: &str, duration: Duration, threshold: Duration) {
        self.log_event(
            PlayerEventType::PerformanceWarning,
            format!(
                "{} took {}ms (threshold: {}ms)",
                operation,
                duration.as_millis(),
                threshold.as_millis()
            ),
            Some(duration),
        );
    }

    /// Most recent `count` events, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<PlayerEvent> {
        let events = self.events();
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events().clear();
    }

    pub fn get_event_statistics(&self) -> EventStatistics {
        let events = self.events();
        let mut stats = EventStatistics {
            total_events: events.len(),
            ..EventStatistics::default()
        };

        for event in events.iter() {
            match event.event_type {
                PlayerEventType::TrackLoaded => stats.tracks_loaded += 1,
                PlayerEventType::MetadataSkipped => stats.metadata_skipped += 1,
                PlayerEventType::SeekOperation => stats.seek_operations += 1,
                PlayerEventType::DecodeError => stats.decode_errors += 1,
                PlayerEventType::StreamError => stats.stream_errors += 1,
                PlayerEventType::PerformanceWarning => stats.performance_warnings += 1,
                _ => {}
            }
        }
        stats
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    level.trim().parse().unwrap_or(log::LevelFilter::Info)
}

/// Statistics about logged events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub tracks_loaded: usize,
    pub metadata_skipped: usize,
    pub seek_operations: usize,
    pub decode_errors: usize,
    pub stream_errors: usize,
    pub performance_warnings: usize,
}

/// Timer utility for measuring operation durations
pub struct OperationTimer {
    start_time: Instant,
    operation_name: String,
}

impl OperationTimer {
    pub fn new(operation_name: String) -> Self {
        trace!("Starting operation: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.elapsed();
        trace!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        duration
    }

    pub fn finish_with_threshold(self, threshold: Duration) -> Duration {
        let duration = self.elapsed();
        if duration > threshold {
            warn!(
                "Operation '{}' took {}ms (threshold: {}ms)",
                self.operation_name,
                duration.as_millis(),
                threshold.as_millis()
            );
        } else {
            debug!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        }
        duration
    }
}

/// Macro for timing operations with threshold warnings
#[macro_export]
macro_rules! time_operation_with_threshold {
    ($name:expr, $threshold:expr, $code:block) => {{
        let timer = $crate::logging::OperationTimer::new($name.to_string());
        let result = $code;
        let _duration = timer.finish_with_threshold($threshold);
        result
    }};
}
