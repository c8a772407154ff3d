use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use super::{AudioOutput, OutputGraph};
use crate::config::EngineConfig;
use crate::error::{AudioError, LoadError};
use crate::models::{PlaybackState, SampleBuffer};

/// Slack allowed between the clock and the buffer end when a source reports
/// it ran dry; the output consumes samples slightly ahead of the clock.
pub const END_TOLERANCE_SECS: f64 = 0.25;

const NOTIFICATION_CAPACITY: usize = 64;

/// Shortest wait before an early end signal is checked again
const MIN_END_RETRY_SECS: f64 = 0.01;

/// Identifies one connected graph; a new id is issued on every `play`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Start/pause notifications for display collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackNotification {
    Started,
    Paused { reset: bool },
    /// The buffer played to its end; sent after the reset pause and before
    /// a loop restart
    Ended { looping: bool },
}

/// Messages consumed by the engine event loop
#[derive(Debug)]
pub enum EngineEvent {
    SourceEnded { graph: GraphId },
    Shutdown,
}

/// One-shot end-of-buffer signal handed to the output with each graph
#[derive(Debug, Clone)]
pub struct EndedSignal {
    graph: GraphId,
    sender: mpsc::UnboundedSender<EngineEvent>,
    fired: Arc<AtomicBool>,
}

impl EndedSignal {
    fn new(graph: GraphId, sender: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            graph,
            sender,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Post the end-of-buffer event; only the first call has an effect
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            let _ = self.sender.send(EngineEvent::SourceEnded { graph: self.graph });
        }
    }
}

/// Timing fields of the current session, all in output-clock seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Clock reading that corresponds to playback position zero
    pub started_at: f64,
    /// Position (before `offset`) at the last pause
    pub paused_at: f64,
    /// Correction applied by seeks
    pub offset: f64,
    pub is_running: bool,
    pub is_loop: bool,
    pub volume: f32,
}

impl ClockState {
    fn new(is_loop: bool, volume: f32) -> Self {
        Self {
            started_at: 0.0,
            paused_at: 0.0,
            offset: 0.0,
            is_running: false,
            is_loop,
            volume,
        }
    }

    fn is_untouched(&self) -> bool {
        self.started_at == 0.0 && self.paused_at == 0.0 && self.offset == 0.0
    }
}

/// What the engine did with an end-of-buffer event
#[derive(Debug, Clone, Copy, PartialEq)]
enum EndHandling {
    Ignored,
    Completed,
    /// The live source ran dry ahead of the clock; check again after
    /// `remaining` seconds
    Deferred { remaining: f64 },
}

struct LiveGraph {
    id: GraphId,
    node: Box<dyn OutputGraph>,
}

struct EngineInner {
    output: Box<dyn AudioOutput>,
    buffer: Option<Arc<SampleBuffer>>,
    graph: Option<LiveGraph>,
    clock: ClockState,
    session: u64,
    next_graph: u64,
    config: EngineConfig,
    events: mpsc::UnboundedSender<EngineEvent>,
    notifications: broadcast::Sender<PlaybackNotification>,
    torn_down: bool,
}

impl EngineInner {
    fn notify(&self, notification: PlaybackNotification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }

    fn duration(&self) -> f64 {
        self.buffer.as_ref().map(|b| b.duration_secs()).unwrap_or(0.0)
    }

    fn current_time(&self) -> f64 {
        if self.buffer.is_none() {
            return 0.0;
        }
        let now = self.output.current_time();
        let position = now - self.clock.started_at + self.clock.offset;
        position.clamp(0.0, self.duration())
    }

    fn release_graph(&mut self) {
        if let Some(mut live) = self.graph.take() {
            live.node.disconnect();
            debug!("Disconnected graph {}", live.id.value());
        }
    }

    /// Drop the graph and rewind clocks without touching the buffer
    fn clear_playback(&mut self) {
        self.release_graph();
        if let Err(e) = self.output.reset() {
            warn!("Failed to reset audio output: {}", e);
        }
        self.clock = ClockState::new(self.config.loop_by_default, self.clock.volume);
    }

    fn begin_session(&mut self) -> u64 {
        self.clear_playback();
        self.buffer = None;
        self.session += 1;
        self.notify(PlaybackNotification::Paused { reset: true });
        debug!("Began load session {}", self.session);
        self.session
    }

    fn commit(&mut self, buffer: Arc<SampleBuffer>) {
        self.clear_playback();
        info!(
            "Loaded {:.2}s of audio ({} Hz, {} channels)",
            buffer.duration_secs(),
            buffer.sample_rate(),
            buffer.channels()
        );
        self.buffer = Some(buffer);
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let Some(buffer) = self.buffer.clone() else {
            return Ok(());
        };
        if self.clock.is_running {
            return Ok(());
        }

        // The output clock is suspended here, so `now` is also the reading
        // at which it resumes
        let now = self.output.current_time();
        if self.clock.is_untouched() {
            self.clock.started_at = now;
        }

        let start_at = (self.clock.paused_at + self.clock.offset).max(0.0);
        let id = GraphId(self.next_graph);
        self.next_graph += 1;
        let signal = EndedSignal::new(id, self.events.clone());

        let mut node = self.output.connect(buffer, start_at, self.clock.volume, signal)?;
        // Resume only once the stream exists so the clock does not run ahead
        // of the audio during stream startup
        if let Err(e) = self.output.resume() {
            node.disconnect();
            return Err(e);
        }

        debug!("Connected graph {} at {:.3}s", id.value(), start_at);
        self.graph = Some(LiveGraph { id, node });
        self.clock.is_running = true;
        self.notify(PlaybackNotification::Started);
        Ok(())
    }

    fn pause(&mut self, reset: bool) -> Result<(), AudioError> {
        if self.clock.is_running {
            let suspended = self.output.suspend();
            if let Err(e) = &suspended {
                warn!("Failed to suspend audio output: {}", e);
            }

            let now = self.output.current_time();
            if reset {
                self.clock.started_at = now;
                self.clock.offset = 0.0;
            }
            self.clock.paused_at = now - self.clock.started_at;

            self.release_graph();
            self.clock.is_running = false;
            self.notify(PlaybackNotification::Paused { reset });
            suspended
        } else if reset && self.buffer.is_some() {
            // Stopping while paused rewinds without touching the output
            self.clock.started_at = self.output.current_time();
            self.clock.offset = 0.0;
            self.clock.paused_at = 0.0;
            self.notify(PlaybackNotification::Paused { reset });
            Ok(())
        } else {
            Ok(())
        }
    }

    fn seek(&mut self, time: f64) -> Result<(), AudioError> {
        if self.buffer.is_none() || !time.is_finite() || time < 0.0 {
            return Ok(());
        }

        let target = time.min(self.duration());
        let now = self.output.current_time();
        self.clock.offset = target - now + self.clock.started_at;
        debug!("Seek to {:.3}s", target);

        if self.clock.is_running {
            self.pause(false)?;
            self.play()?;
        }
        Ok(())
    }

    fn change_volume(&mut self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.clock.volume;
        }
        let volume = self.config.clamp_volume(value);
        self.clock.volume = volume;
        if let Some(live) = self.graph.as_mut() {
            live.node.set_gain(volume);
        }
        volume
    }

    fn handle_source_ended(&mut self, graph: GraphId) -> Result<EndHandling, AudioError> {
        match &self.graph {
            Some(live) if live.id == graph && self.clock.is_running => {}
            _ => {
                debug!("Ignoring end of stale graph {}", graph.value());
                return Ok(EndHandling::Ignored);
            }
        }

        let position = self.current_time();
        let duration = self.duration();
        if position < duration - END_TOLERANCE_SECS {
            let remaining = (duration - position).max(MIN_END_RETRY_SECS);
            debug!(
                "Graph {} ran dry at {:.3}s of {:.3}s, rechecking in {:.3}s",
                graph.value(),
                position,
                duration,
                remaining
            );
            return Ok(EndHandling::Deferred { remaining });
        }

        self.pause(true)?;
        let looping = self.clock.is_loop;
        self.notify(PlaybackNotification::Ended { looping });
        if looping {
            debug!("Looping back to start");
            self.play()?;
        }
        Ok(EndHandling::Completed)
    }

    fn state(&self) -> PlaybackState {
        if self.buffer.is_none() {
            PlaybackState::Unloaded
        } else if self.clock.is_running {
            PlaybackState::Playing
        } else if self.clock.paused_at + self.clock.offset == 0.0 {
            PlaybackState::Loaded
        } else {
            PlaybackState::Paused
        }
    }
}

/// Handle to the playback engine.
///
/// Clones share the same engine. Every operation runs to completion under a
/// single lock, including end-of-buffer handling posted by the output.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<Mutex<EngineInner>>,
    events: mpsc::UnboundedSender<EngineEvent>,
    notifications: broadcast::Sender<PlaybackNotification>,
}

/// Applies queued engine events
pub struct EngineEventLoop {
    inner: Arc<Mutex<EngineInner>>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    sender: mpsc::UnboundedSender<EngineEvent>,
    /// Early end signals waiting for the clock to catch up (drain mode)
    deferred: Vec<GraphId>,
}

enum Dispatch {
    Continue,
    Defer { graph: GraphId, remaining: f64 },
    Stop,
}

fn lock_inner(inner: &Mutex<EngineInner>) -> MutexGuard<'_, EngineInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlaybackEngine {
    /// Create an engine writing to `output`, plus the loop that must be run
    /// (or drained) for end-of-buffer events to take effect.
    pub fn create(output: Box<dyn AudioOutput>, config: EngineConfig) -> (Self, EngineEventLoop) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let inner = EngineInner {
            output,
            buffer: None,
            graph: None,
            clock: ClockState::new(config.loop_by_default, config.initial_volume),
            session: 0,
            next_graph: 0,
            config,
            events: events_tx.clone(),
            notifications: notifications.clone(),
            torn_down: false,
        };
        let inner = Arc::new(Mutex::new(inner));

        let event_loop = EngineEventLoop {
            inner: Arc::clone(&inner),
            events: events_rx,
            sender: events_tx.clone(),
            deferred: Vec::new(),
        };
        let engine = Self {
            inner,
            events: events_tx,
            notifications,
        };
        (engine, event_loop)
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        lock_inner(&self.inner)
    }

    /// Release the output and stop the event loop. Later loads are rejected.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        if inner.torn_down {
            return;
        }
        inner.clear_playback();
        inner.buffer = None;
        inner.torn_down = true;
        let _ = self.events.send(EngineEvent::Shutdown);
        info!("Playback engine torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock().torn_down
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackNotification> {
        self.notifications.subscribe()
    }

    /// Tear down the current session and start a new one with no buffer
    pub fn begin_session(&self) -> Result<u64, AudioError> {
        let mut inner = self.lock();
        if inner.torn_down {
            return Err(AudioError::EngineShutDown);
        }
        Ok(inner.begin_session())
    }

    /// Commit a decoded buffer to `session` if no newer session has begun
    pub fn load_session(&self, session: u64, buffer: SampleBuffer) -> Result<(), LoadError> {
        let mut inner = self.lock();
        if inner.torn_down {
            return Err(AudioError::EngineShutDown.into());
        }
        if inner.session != session {
            debug!("Discarding buffer for session {} (current {})", session, inner.session);
            return Err(LoadError::Superseded { session: inner.session });
        }
        inner.commit(Arc::new(buffer));
        Ok(())
    }

    /// Replace whatever is loaded with `buffer`
    pub fn load(&self, buffer: SampleBuffer) -> Result<u64, AudioError> {
        let mut inner = self.lock();
        if inner.torn_down {
            return Err(AudioError::EngineShutDown);
        }
        let session = inner.begin_session();
        inner.commit(Arc::new(buffer));
        Ok(session)
    }

    pub fn unload(&self) -> Result<(), AudioError> {
        self.begin_session().map(|_| ())
    }

    pub fn play(&self) -> Result<(), AudioError> {
        self.lock().play()
    }

    pub fn pause(&self, reset: bool) -> Result<(), AudioError> {
        self.lock().pause(reset)
    }

    pub fn stop(&self) -> Result<(), AudioError> {
        self.pause(true)
    }

    /// Jump to `time` seconds; negative or non-finite times are ignored
    pub fn seek(&self, time: f64) -> Result<(), AudioError> {
        self.lock().seek(time)
    }

    /// Seek entry point for position displays
    pub fn move_to(&self, time: f64) -> Result<(), AudioError> {
        self.seek(time)
    }

    /// Flip looping and return the new value
    pub fn toggle_loop(&self) -> bool {
        let mut inner = self.lock();
        inner.clock.is_loop = !inner.clock.is_loop;
        inner.clock.is_loop
    }

    /// Clamp `value` into the configured range and apply it; returns the
    /// volume actually set
    pub fn change_volume(&self, value: f32) -> f32 {
        self.lock().change_volume(value)
    }

    pub fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    pub fn duration(&self) -> f64 {
        self.lock().duration()
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().buffer.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.lock().clock.is_running
    }

    pub fn is_loop(&self) -> bool {
        self.lock().clock.is_loop
    }

    pub fn volume(&self) -> f32 {
        self.lock().clock.volume
    }

    pub fn volume_range(&self) -> (f32, f32) {
        let inner = self.lock();
        (inner.config.volume_min, inner.config.volume_max)
    }

    pub fn clock_state(&self) -> ClockState {
        self.lock().clock
    }

    pub fn session(&self) -> u64 {
        self.lock().session
    }

    pub fn device_name(&self) -> Option<String> {
        self.lock().output.device_name()
    }
}

impl EngineEventLoop {
    /// Apply events until the engine is torn down. An early end signal is
    /// posted again once the clock should have reached the buffer end.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            match self.dispatch(event) {
                Dispatch::Continue => {}
                Dispatch::Defer { graph, remaining } => {
                    let sender = self.sender.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
                        let _ = sender.send(EngineEvent::SourceEnded { graph });
                    });
                }
                Dispatch::Stop => break,
            }
        }
        debug!("Engine event loop stopped");
    }

    /// Apply every event already queued, after rechecking early end signals
    /// from earlier drains; returns how many were handled
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        let deferred = std::mem::take(&mut self.deferred);
        let queued = std::iter::from_fn(|| self.events.try_recv().ok()).collect::<Vec<_>>();
        let events = deferred
            .into_iter()
            .map(|graph| EngineEvent::SourceEnded { graph })
            .chain(queued);

        for event in events {
            handled += 1;
            match self.dispatch(event) {
                Dispatch::Continue => {}
                Dispatch::Defer { graph, .. } => self.deferred.push(graph),
                Dispatch::Stop => break,
            }
        }
        handled
    }

    /// Early end signals still waiting on the clock
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    fn dispatch(&self, event: EngineEvent) -> Dispatch {
        match event {
            EngineEvent::SourceEnded { graph } => {
                let mut inner = lock_inner(&self.inner);
                match inner.handle_source_ended(graph) {
                    Ok(EndHandling::Deferred { remaining }) => Dispatch::Defer { graph, remaining },
                    Ok(EndHandling::Ignored | EndHandling::Completed) => Dispatch::Continue,
                    Err(e) => {
                        warn!("End-of-buffer handling failed: {}", e);
                        Dispatch::Continue
                    }
                }
            }
            EngineEvent::Shutdown => Dispatch::Stop,
        }
    }
}
