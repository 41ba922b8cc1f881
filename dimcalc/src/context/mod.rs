//! Event contexts
//!
//! Keys are delivered to the innermost active context. The bottom `Normal`
//! frame is never popped; macro playback and modal operations push frames on
//! top of it. A frame being suspended may carry a continuation which runs
//! when control returns to it.

use crate::engine::Engine;
use crate::value::{CalcState, TaggedValue};
use crate::CalcResult;
use std::fmt;

/// Operation a modal context is collecting a key for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalOp {
    /// Apply a unary key to each element of an array
    Map,
    /// Fold an array with a binary key
    Reduce,
    /// Repeatedly apply a unary key to a seed
    Sequence,
}

/// Operands captured when a modal context starts
#[derive(Debug, Clone, PartialEq)]
pub struct ModalCapture {
    pub op: ModalOp,
    pub operands: Vec<TaggedValue>,
    pub pre_state: CalcState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextKind {
    Normal,
    Playback { macro_tag: String },
    Modal(ModalCapture),
}

impl ContextKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContextKind::Normal => "normal",
            ContextKind::Playback { .. } => "playback",
            ContextKind::Modal(_) => "modal",
        }
    }
}

/// Work to run when a suspended context becomes active again
pub type Continuation = Box<dyn FnOnce(&mut Engine) -> CalcResult<()> + Send>;

struct Frame {
    kind: ContextKind,
    continuation: Option<Continuation>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("kind", &self.kind)
            .field("continuation", &self.continuation.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                kind: ContextKind::Normal,
                continuation: None,
            }],
        }
    }

    pub fn active(&self) -> &ContextKind {
        // The bottom frame is never removed
        match self.frames.last() {
            Some(frame) => &frame.kind,
            None => &ContextKind::Normal,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ContextKind> {
        if self.frames.len() > 1 {
            self.frames.last_mut().map(|frame| &mut frame.kind)
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Suspend the active frame under `kind`; `continuation` runs when the
    /// suspended frame resumes
    pub fn push(&mut self, kind: ContextKind, continuation: Option<Continuation>) {
        if let Some(top) = self.frames.last_mut() {
            top.continuation = continuation;
        }
        self.frames.push(Frame {
            kind,
            continuation: None,
        });
    }

    /// Leave the active frame. Returns its kind and the continuation of the
    /// frame that resumes; `None` at the bottom.
    pub fn pop(&mut self) -> Option<(ContextKind, Option<Continuation>)> {
        if self.frames.len() <= 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        let continuation = self.frames.last_mut().and_then(|top| top.continuation.take());
        Some((frame.kind, continuation))
    }

    /// Drop frames above `depth` without running their continuations
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
        if let Some(top) = self.frames.last_mut() {
            top.continuation = None;
        }
    }

    /// The chain of kinds, bottom first
    pub fn snapshot(&self) -> Vec<ContextKind> {
        self.frames.iter().map(|frame| frame.kind.clone()).collect()
    }

    /// Rebuild the chain from a snapshot. `rebuild` supplies the
    /// continuation for the frame suspended under each pushed kind.
    pub fn restore(
        &mut self,
        kinds: &[ContextKind],
        rebuild: impl Fn(&ContextKind) -> Option<Continuation>,
    ) {
        self.truncate(1);
        for kind in kinds.iter().skip(1) {
            self.push(kind.clone(), rebuild(kind));
        }
    }

    pub fn playback_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| matches!(frame.kind, ContextKind::Playback { .. }))
            .count()
    }

    pub fn is_modal(&self) -> bool {
        matches!(self.active(), ContextKind::Modal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn noop() -> Continuation {
        Box::new(|_| Ok(()))
    }

    fn playback(tag: &str) -> ContextKind {
        ContextKind::Playback {
            macro_tag: tag.to_string(),
        }
    }

    #[test]
    fn bottom_frame_is_never_popped() {
        let mut contexts = ContextStack::new();
        assert!(contexts.pop().is_none());
        assert_eq!(contexts.active(), &ContextKind::Normal);
        contexts.truncate(0);
        assert_eq!(contexts.depth(), 1);
    }

    #[test]
    fn continuation_belongs_to_the_suspended_frame() {
        let mut contexts = ContextStack::new();
        contexts.push(playback("a"), Some(noop()));
        contexts.push(playback("b"), None);
        let (kind, continuation) = contexts.pop().unwrap();
        assert_eq!(kind, playback("b"));
        assert!(continuation.is_none());
        let (kind, continuation) = contexts.pop().unwrap();
        assert_eq!(kind, playback("a"));
        assert!(continuation.is_some());
    }

    #[test]
    fn restore_rebuilds_chain_and_continuations() {
        let mut contexts = ContextStack::new();
        contexts.push(playback("a"), None);
        contexts.push(playback("b"), None);
        let chain = contexts.snapshot();
        contexts.truncate(1);

        let rebuilt = Arc::new(AtomicUsize::new(0));
        let counter = rebuilt.clone();
        contexts.restore(&chain, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(noop())
        });
        assert_eq!(contexts.snapshot(), chain);
        assert_eq!(contexts.playback_depth(), 2);
        assert_eq!(rebuilt.load(Ordering::SeqCst), 2);
    }
}
