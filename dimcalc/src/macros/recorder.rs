use super::{LocalFrames, Macro, MacroOp, MacroOpSeq};
use crate::context::ContextKind;
use crate::value::{CalcState, SymbolTag};

/// Everything needed to take back one recorded entry
#[derive(Debug, Clone, PartialEq)]
pub struct RollbackPoint {
    pub state: CalcState,
    pub contexts: Vec<ContextKind>,
    pub undo_depth: usize,
    pub locals: LocalFrames,
}

#[derive(Debug, Clone)]
struct Recording {
    tag: SymbolTag,
    ops: MacroOpSeq,
    /// One point per entry of `ops`, taken before the entry ran
    rollback: Vec<RollbackPoint>,
}

/// Macro recorder. Pauses nest like the undo stack's.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    recording: Option<Recording>,
    paused: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin recording into `tag`, discarding any unfinished recording
    pub fn start(&mut self, tag: SymbolTag) {
        self.recording = Some(Recording {
            tag,
            ops: MacroOpSeq::new(),
            rollback: Vec::new(),
        });
    }

    /// Finish and hand back the recorded macro
    pub fn stop(&mut self) -> Option<Macro> {
        self.recording.take().map(|r| Macro::new(r.tag, r.ops))
    }

    /// Abandon the current recording
    pub fn cancel(&mut self) {
        self.recording = None;
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Recording and not paused
    pub fn is_active(&self) -> bool {
        self.recording.is_some() && self.paused == 0
    }

    pub fn tag(&self) -> Option<&SymbolTag> {
        self.recording.as_ref().map(|r| &r.tag)
    }

    pub fn ops(&self) -> Option<&MacroOpSeq> {
        self.recording.as_ref().map(|r| &r.ops)
    }

    /// Append an entry with the point to roll back to. Ignored while paused.
    pub fn record(&mut self, op: MacroOp, point: RollbackPoint) {
        if self.paused > 0 {
            return;
        }
        if let Some(recording) = self.recording.as_mut() {
            recording.ops.push(op);
            recording.rollback.push(point);
        }
    }

    /// Last recorded entry, for in-place edits such as stripping a tag
    pub fn last_mut(&mut self) -> Option<&mut MacroOp> {
        self.recording.as_mut()?.ops.last_mut()
    }

    /// Remove the last entry and return the point recorded with it
    pub fn rollback_last(&mut self) -> Option<(MacroOp, RollbackPoint)> {
        let recording = self.recording.as_mut()?;
        let op = recording.ops.pop()?;
        let point = recording.rollback.pop()?;
        Some((op, point))
    }

    pub fn pause(&mut self) {
        self.paused += 1;
    }

    pub fn resume(&mut self) {
        self.paused = self.paused.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TaggedValue;

    fn point(x: f64) -> RollbackPoint {
        let mut state = CalcState::default();
        state.set_x(TaggedValue::real(x));
        RollbackPoint {
            state,
            contexts: vec![ContextKind::Normal],
            undo_depth: 0,
            locals: LocalFrames::new(),
        }
    }

    #[test]
    fn rollback_returns_the_point_of_the_entry() {
        let mut recorder = Recorder::new();
        recorder.start(SymbolTag::new("f"));
        recorder.record(MacroOp::Value(TaggedValue::real(3.0)), point(0.0));
        recorder.record(MacroOp::Value(TaggedValue::real(4.0)), point(3.0));
        let (op, point) = recorder.rollback_last().unwrap();
        assert_eq!(op, MacroOp::Value(TaggedValue::real(4.0)));
        assert_eq!(point.state.x().as_real(), Some(3.0));
        assert_eq!(recorder.ops().unwrap().len(), 1);
    }

    #[test]
    fn paused_recorder_drops_entries() {
        let mut recorder = Recorder::new();
        recorder.start(SymbolTag::new("f"));
        recorder.pause();
        recorder.record(MacroOp::Value(TaggedValue::real(3.0)), point(0.0));
        assert!(!recorder.is_active());
        recorder.resume();
        let recorded = recorder.stop().unwrap();
        assert!(recorded.ops.is_empty());
        assert!(!recorder.is_recording());
    }
}
