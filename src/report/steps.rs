// src/report/steps.rs

//! Step correlation.
//!
//! A test's flat event list carries step structure in two independent
//! conventions:
//!
//! - bracket-based: events strictly between `step_start(index = i)` and the
//!   next `step_end(index = i)` belong to step `i`;
//! - field-based: some event kinds (trace, metric) carry a `stepIndex` and
//!   belong to that step even when emitted outside any open bracket, e.g.
//!   from asynchronous instrumentation.
//!
//! Both attribution paths are unioned per step without duplicating events
//! that satisfy both. When an event sits inside an open bracket *and*
//! carries a conflicting `stepIndex`, the bracket wins; the artifact format
//! defines no tie-break, so this is a deliberate decision here, not
//! inferred intent.

use std::collections::BTreeMap;

use super::model::{Event, EventKind, StepState};

/// One step's share of a test's event stream.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub index: u64,
    /// Terminal status from the step's `step_end` event, if one was seen.
    pub status: Option<StepState>,
    /// Events attributed to this step, in stream order.
    pub events: Vec<Event>,
}

/// Map a flat event list onto its steps.
///
/// Steps are returned ordered by index. Events that belong to no step
/// (no enclosing bracket, no `stepIndex`) are not represented here.
pub fn correlate_steps(events: &[Event]) -> Vec<StepReport> {
    let mut steps: BTreeMap<u64, StepReport> = BTreeMap::new();
    let mut open: Option<u64> = None;

    let mut entry = |steps: &mut BTreeMap<u64, StepReport>, index: u64| {
        steps.entry(index).or_insert_with(|| StepReport {
            index,
            status: None,
            events: Vec::new(),
        });
    };

    for event in events {
        match event.kind {
            EventKind::StepStart => {
                if let Some(index) = event.index {
                    entry(&mut steps, index);
                    open = Some(index);
                }
            }
            EventKind::StepEnd => {
                if let Some(index) = event.index {
                    entry(&mut steps, index);
                    if let Some(step) = steps.get_mut(&index) {
                        step.status = event.status;
                    }
                    if open == Some(index) {
                        open = None;
                    }
                }
            }
            _ => {
                // Bracket wins over a conflicting stepIndex.
                let attributed = open.or(event.step_index);
                if let Some(index) = attributed {
                    entry(&mut steps, index);
                    if let Some(step) = steps.get_mut(&index) {
                        step.events.push(event.clone());
                    }
                }
            }
        }
    }

    steps.into_values().collect()
}
