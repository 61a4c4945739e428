//! Host-side interaction state machine.
//!
//! The page script only buffers raw DOM signals. This module decides which of
//! them are user actions: text typed into a field is held back until the field
//! loses focus, is clicked away from, or the page unloads, and only the last
//! value of an edit is emitted. Element identity comes from the per-document
//! key assigned by the page, never from the synthesized selector.

use std::collections::HashMap;

use crate::models::{
    CapturedEvent, Coordinates, ElementSnapshot, EventKind, FocusedField, PageSignal, SignalKind,
    WaitCondition,
};

use super::selector::synthesize;

#[derive(Debug, Clone)]
struct PendingInput {
    element: ElementSnapshot,
    value: String,
    /// Position of the field's first keystroke among pending fields
    order: u64,
}

#[derive(Debug, Default)]
pub struct Interceptor {
    /// Live values typed but not yet emitted, by element key
    pending: HashMap<String, PendingInput>,
    /// Value emitted for the current edit of each element
    committed: HashMap<String, String>,
    next_order: u64,
}

impl Interceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields with typed values not yet emitted
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Turn one page signal into zero or more captured events
    pub fn handle(&mut self, signal: &PageSignal) -> Vec<CapturedEvent> {
        let mut events = Vec::new();

        match signal.kind {
            SignalKind::Click => {
                let Some(target) = signal.element.as_ref() else {
                    return events;
                };

                // Clicking away from a filled field ends its edit even without a blur
                if let Some(focused) = &signal.focused {
                    if focused.element.key != target.key {
                        self.flush_focused(focused, signal.timestamp, &mut events);
                    }
                }

                // Clicks that only focus a text field are not actions
                if !target.is_text_field() {
                    let mut event = event_for(
                        EventKind::Click,
                        target,
                        String::new(),
                        WaitCondition::ElementClickable,
                        signal.timestamp,
                    );
                    event.coordinates = signal.x.zip(signal.y).map(|(x, y)| Coordinates { x, y });
                    events.push(event);
                }
            }
            SignalKind::Input => {
                if let Some(element) = signal.element.as_ref().filter(|e| e.is_text_field()) {
                    self.committed.remove(&element.key);
                    let value = signal.value.clone().unwrap_or_default();
                    match self.pending.get_mut(&element.key) {
                        Some(pending) => pending.value = value,
                        None => {
                            self.next_order += 1;
                            self.pending.insert(
                                element.key.clone(),
                                PendingInput {
                                    element: element.clone(),
                                    value,
                                    order: self.next_order,
                                },
                            );
                        }
                    }
                }
            }
            SignalKind::Blur => {
                if let Some(element) = signal.element.as_ref() {
                    if let Some(pending) = self.pending.remove(&element.key) {
                        let value = signal.value.clone().unwrap_or(pending.value);
                        self.commit(element, value, signal.timestamp, &mut events);
                    }
                }
            }
            SignalKind::Change => {
                let Some(element) = signal.element.as_ref() else {
                    return events;
                };

                if element.is_select() {
                    let value = signal
                        .text
                        .clone()
                        .or_else(|| signal.value.clone())
                        .unwrap_or_default();
                    events.push(event_for(
                        EventKind::SelectOption,
                        element,
                        value,
                        WaitCondition::ElementVisible,
                        signal.timestamp,
                    ));
                } else if element.is_file_input() {
                    events.push(event_for(
                        EventKind::FileUpload,
                        element,
                        signal.files.join(", "),
                        WaitCondition::ElementVisible,
                        signal.timestamp,
                    ));
                }
            }
            SignalKind::Flush => {
                if let Some(focused) = &signal.focused {
                    self.flush_focused(focused, signal.timestamp, &mut events);
                }
                events.extend(self.flush_pending(signal.timestamp));
            }
        }

        events
    }

    /// Emit every pending typed value in the order the fields were first edited
    pub fn flush_pending(&mut self, timestamp: i64) -> Vec<CapturedEvent> {
        let mut pending: Vec<PendingInput> = self.pending.drain().map(|(_, p)| p).collect();
        pending.sort_by_key(|p| p.order);

        let mut events = Vec::new();
        for input in pending {
            self.commit(&input.element, input.value, timestamp, &mut events);
        }
        events
    }

    /// Forget per-document state after flushing it
    pub fn reset_document(&mut self) {
        self.pending.clear();
        self.committed.clear();
    }

    fn flush_focused(&mut self, focused: &FocusedField, timestamp: i64, events: &mut Vec<CapturedEvent>) {
        if !focused.element.is_text_field() || focused.value.is_empty() {
            return;
        }
        self.pending.remove(&focused.element.key);
        self.commit(&focused.element, focused.value.clone(), timestamp, events);
    }

    fn commit(
        &mut self,
        element: &ElementSnapshot,
        value: String,
        timestamp: i64,
        events: &mut Vec<CapturedEvent>,
    ) {
        if self.committed.get(&element.key) == Some(&value) {
            tracing::debug!("Skipping duplicate text input for element {}", element.key);
            return;
        }
        self.committed.insert(element.key.clone(), value.clone());
        events.push(event_for(
            EventKind::TextInput,
            element,
            value,
            WaitCondition::ElementVisible,
            timestamp,
        ));
    }
}

fn event_for(
    kind: EventKind,
    element: &ElementSnapshot,
    value: String,
    wait_condition: WaitCondition,
    timestamp_ms: i64,
) -> CapturedEvent {
    let selectors = synthesize(element);
    CapturedEvent {
        kind,
        selector_primary: selectors.primary,
        selector_alternatives: selectors.alternatives,
        text: selectors.text,
        value,
        element_type: selectors.element_type,
        tag_name: selectors.tag_name,
        timestamp_ms,
        wait_condition,
        coordinates: None,
    }
}
