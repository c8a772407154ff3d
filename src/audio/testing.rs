//! Deterministic output for engine and pipeline tests.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{AudioOutput, EndedSignal, OutputGraph};
use crate::error::AudioError;
use crate::models::SampleBuffer;

#[derive(Debug)]
struct GraphRecord {
    start_at: f64,
    gain: f32,
    connected: bool,
    /// Whether the clock was already running when the graph was built
    clock_running: bool,
    signal: EndedSignal,
}

#[derive(Debug, Default)]
struct ManualState {
    time: f64,
    running: bool,
    graphs: Vec<GraphRecord>,
    resets: usize,
    fail_next_connect: bool,
}

/// Output whose clock moves only when a test calls [`ManualOutput::advance`]
/// while the output is resumed. Clones share state, so a test keeps one
/// clone and hands another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualOutput {
    state: Arc<Mutex<ManualState>>,
}

impl ManualOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap()
    }

    pub fn advance(&self, seconds: f64) {
        let mut state = self.state();
        if state.running {
            state.time += seconds;
        }
    }

    pub fn time(&self) -> f64 {
        self.state().time
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn resets(&self) -> usize {
        self.state().resets
    }

    /// Graphs ever connected
    pub fn graph_count(&self) -> usize {
        self.state().graphs.len()
    }

    /// Graphs not yet disconnected
    pub fn connected_count(&self) -> usize {
        self.state().graphs.iter().filter(|g| g.connected).count()
    }

    pub fn last_start_at(&self) -> Option<f64> {
        self.state().graphs.last().map(|g| g.start_at)
    }

    pub fn last_gain(&self) -> Option<f32> {
        self.state().graphs.last().map(|g| g.gain)
    }

    pub fn last_connected_while_running(&self) -> Option<bool> {
        self.state().graphs.last().map(|g| g.clock_running)
    }

    pub fn fail_next_connect(&self) {
        self.state().fail_next_connect = true;
    }

    /// Fire the end signal of the most recent connected graph
    pub fn finish_source(&self) -> bool {
        let state = self.state();
        match state.graphs.iter().rev().find(|g| g.connected) {
            Some(graph) => {
                graph.signal.fire();
                true
            }
            None => false,
        }
    }

    /// Fire the end signal of the `index`-th graph, connected or not
    pub fn finish_graph(&self, index: usize) {
        if let Some(graph) = self.state().graphs.get(index) {
            graph.signal.fire();
        }
    }
}

impl AudioOutput for ManualOutput {
    fn current_time(&self) -> f64 {
        self.state().time
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.state().running = true;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.state().running = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AudioError> {
        let mut state = self.state();
        state.time = 0.0;
        state.running = false;
        state.resets += 1;
        for graph in state.graphs.iter_mut() {
            graph.connected = false;
        }
        Ok(())
    }

    fn connect(
        &mut self,
        _buffer: Arc<SampleBuffer>,
        start_at: f64,
        gain: f32,
        on_ended: EndedSignal,
    ) -> Result<Box<dyn OutputGraph>, AudioError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_connect) {
            return Err(AudioError::StreamError("simulated connect failure".to_string()));
        }
        let clock_running = state.running;
        state.graphs.push(GraphRecord {
            start_at,
            gain,
            connected: true,
            clock_running,
            signal: on_ended,
        });
        Ok(Box::new(ManualGraph {
            state: Arc::clone(&self.state),
            index: state.graphs.len() - 1,
        }))
    }

    fn device_name(&self) -> Option<String> {
        Some("manual".to_string())
    }
}

struct ManualGraph {
    state: Arc<Mutex<ManualState>>,
    index: usize,
}

impl OutputGraph for ManualGraph {
    fn set_gain(&mut self, gain: f32) {
        if let Some(graph) = self.state.lock().unwrap().graphs.get_mut(self.index) {
            graph.gain = gain;
        }
    }

    fn disconnect(&mut self) {
        if let Some(graph) = self.state.lock().unwrap().graphs.get_mut(self.index) {
            graph.connected = false;
        }
    }
}
