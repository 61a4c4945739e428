use std::time::Instant;
use tokio::sync::broadcast;

use crate::models::{CapturedEvent, RecordedStep, RecordingMetrics};

/// Accumulates recorded steps for one session.
///
/// Steps are append-only and numbered 1..N in capture order; the counter
/// restarts only when the list is cleared.
pub struct StepRecorder {
    steps: Vec<RecordedStep>,
    started_at: Instant,
    step_sender: broadcast::Sender<RecordedStep>,
}

impl StepRecorder {
    pub fn new() -> Self {
        let (step_tx, _) = broadcast::channel(256);
        Self {
            steps: Vec::new(),
            started_at: Instant::now(),
            step_sender: step_tx,
        }
    }

    /// Append a step for a captured event. Never rejects.
    pub fn add_step(&mut self, event: &CapturedEvent, screenshot_before: Option<Vec<u8>>) -> RecordedStep {
        let step = RecordedStep {
            step_id: self.steps.len() as u32 + 1,
            action: event.kind.as_str().to_string(),
            target: event.selector_primary.clone(),
            value: event.value.clone(),
            alternatives: event.selector_alternatives.clone(),
            wait_condition: event.wait_condition.as_str().to_string(),
            element_type: event.element_type.clone(),
            screenshot_before,
            timestamp_ms: event.timestamp_ms,
        };

        tracing::debug!("Step {}: {} {}", step.step_id, step.action, step.target);
        self.steps.push(step.clone());

        // No receivers is fine
        let _ = self.step_sender.send(step.clone());
        step
    }

    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn metrics(&self) -> RecordingMetrics {
        RecordingMetrics {
            step_count: self.steps.len(),
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            last_action: self
                .steps
                .last()
                .map(|s| format!("{} {}", s.action, s.target)),
        }
    }

    /// Subscribe to steps as they are recorded
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedStep> {
        self.step_sender.subscribe()
    }
}

impl Default for StepRecorder {
    fn default() -> Self {
        Self::new()
    }
}
