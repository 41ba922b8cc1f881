//! Bounded undo history of calculator states

use crate::value::CalcState;
use std::collections::VecDeque;

/// Undo history. While paused, pushes and discards are ignored so that a
/// macro playback leaves exactly one entry behind.
#[derive(Debug, Clone)]
pub struct UndoStack {
    states: VecDeque<CalcState>,
    max_depth: usize,
    paused: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            states: VecDeque::new(),
            max_depth,
            paused: 0,
        }
    }

    /// Remember `state`; the oldest entry is dropped once the cap is reached
    pub fn push(&mut self, state: CalcState) {
        if self.is_paused() || self.max_depth == 0 {
            return;
        }
        if self.states.len() == self.max_depth {
            self.states.pop_front();
        }
        self.states.push_back(state);
    }

    /// Most recent state, for the undo key
    pub fn pop(&mut self) -> Option<CalcState> {
        self.states.pop_back()
    }

    /// Forget the most recent entry after a failed transaction
    pub fn pop_discard(&mut self) {
        if !self.is_paused() {
            self.states.pop_back();
        }
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.states.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Pauses nest; each `pause` needs a matching `resume`
    pub fn pause(&mut self) {
        self.paused += 1;
    }

    pub fn resume(&mut self) {
        self.paused = self.paused.saturating_sub(1);
    }

    pub fn is_paused(&self) -> bool {
        self.paused > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TaggedValue;

    fn state(x: f64) -> CalcState {
        let mut state = CalcState::default();
        state.set_x(TaggedValue::real(x));
        state
    }

    #[test]
    fn oldest_entry_is_dropped_at_the_cap() {
        let mut undo = UndoStack::new(2);
        undo.push(state(1.0));
        undo.push(state(2.0));
        undo.push(state(3.0));
        assert_eq!(undo.depth(), 2);
        assert_eq!(undo.pop().unwrap().x().as_real(), Some(3.0));
        assert_eq!(undo.pop().unwrap().x().as_real(), Some(2.0));
        assert!(undo.pop().is_none());
    }

    #[test]
    fn paused_history_ignores_push_and_discard() {
        let mut undo = UndoStack::new(10);
        undo.push(state(1.0));
        undo.pause();
        undo.pause();
        undo.push(state(2.0));
        undo.pop_discard();
        undo.resume();
        assert!(undo.is_paused());
        undo.resume();
        assert!(!undo.is_paused());
        assert_eq!(undo.depth(), 1);
    }
}
