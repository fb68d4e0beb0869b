//! RAII scope guards that apply house-event/mission-time overrides for the
//! duration of one analysis and restore prior state on every exit path,
//! including an early return or panic unwind.

use crate::model::{HouseEventId, Model};
use std::cell::Cell;

/// Temporarily forces a set of house events to fixed states, restoring each
/// one's previous state when dropped.
pub struct HouseEventGuard<'m> {
    model: &'m Model,
    saved: Vec<(HouseEventId, bool)>,
}

impl<'m> HouseEventGuard<'m> {
    pub fn apply(model: &'m Model, instructions: &[(HouseEventId, bool)]) -> Self {
        let mut saved = Vec::with_capacity(instructions.len());
        for &(id, state) in instructions {
            let event = model.house_event(id);
            saved.push((id, event.state.get()));
            event.state.set(state);
        }
        Self { model, saved }
    }
}

impl<'m> Drop for HouseEventGuard<'m> {
    fn drop(&mut self) {
        for &(id, state) in &self.saved {
            self.model.house_event(id).state.set(state);
        }
    }
}

/// Temporarily rescales the model's mission time (e.g. to a phase's
/// duration), restoring the original value when dropped.
pub struct MissionTimeGuard {
    cell: std::rc::Rc<Cell<f64>>,
    saved: f64,
}

impl MissionTimeGuard {
    pub fn scale(cell: std::rc::Rc<Cell<f64>>, factor: f64) -> Self {
        let saved = cell.get();
        cell.set(saved * factor);
        Self { cell, saved }
    }
}

impl Drop for MissionTimeGuard {
    fn drop(&mut self) {
        self.cell.set(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn house_event_guard_restores_prior_state_on_drop() {
        let mut model = Model::new("m", 100.0);
        let h = model.add_house_event("H", false);
        assert!(!model.house_event(h).state.get());
        {
            let _guard = HouseEventGuard::apply(&model, &[(h, true)]);
            assert!(model.house_event(h).state.get());
        }
        assert!(!model.house_event(h).state.get());
    }

    #[test]
    fn mission_time_guard_restores_original_value() {
        let model = Model::new("m", 100.0);
        let cell = model.mission_time();
        {
            let _guard = MissionTimeGuard::scale(model.mission_time(), 0.25);
            assert!((cell.get() - 25.0).abs() < 1e-9);
        }
        assert!((cell.get() - 100.0).abs() < 1e-9);
    }
}
