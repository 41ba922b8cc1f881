//! Macro playback
//!
//! A macro runs inside its own playback context. Its keys go through the
//! same routing as typed keys, so nested `play` keys, modal operations and
//! locals all behave as they do interactively. A failing step puts the
//! engine back exactly as it was before playback started.

use super::{continuation_for, Engine, Outcome};
use crate::context::ContextKind;
use crate::macros::{Macro, MacroOp};
use crate::value::SymbolTag;
use crate::{CalcError, CalcResult};
use tracing::{debug, warn};

impl Engine {
    /// Play the macro named `tag` as a single undoable step
    pub(super) fn play(&mut self, tag: &SymbolTag) -> CalcResult<Outcome> {
        let definition = self
            .library
            .find(tag)
            .cloned()
            .ok_or_else(|| CalcError::UnknownSymbol(tag.to_string()))?;

        let max = self.limits.max_playback_depth;
        if self.contexts.playback_depth() >= max {
            warn!(macro_tag = %tag, limit = max, "playback nested too deeply");
            return Err(CalcError::limit("max_playback_depth", max));
        }

        let pre_state = self.state.clone();
        let depth = self.contexts.depth();
        self.undo.push(pre_state.clone());

        let kind = ContextKind::Playback {
            macro_tag: tag.to_string(),
        };
        let continuation = continuation_for(&kind);
        self.contexts.push(kind, continuation);
        self.locals.push();
        self.undo.pause();
        self.recorder.pause();

        let saved = std::mem::take(&mut self.queue);
        let result = self.run_ops(&definition);
        self.queue = saved;
        self.undo.resume();
        self.recorder.resume();

        match result {
            Ok(()) => {
                self.pop_context(false)?;
                debug!(macro_tag = %tag, steps = definition.ops.len(), "played");
                Ok(Outcome::StateChanged)
            }
            Err(err) => {
                // The playback frame's continuation pops the locals frame;
                // truncating skips it, so pop here
                self.contexts.truncate(depth);
                self.locals.pop();
                self.state = pre_state;
                self.entry = None;
                self.undo.pop_discard();
                warn!(macro_tag = %tag, error = %err, "playback rolled back");
                Err(err)
            }
        }
    }

    fn run_ops(&mut self, definition: &Macro) -> CalcResult<()> {
        let wrap = |index: usize, err: CalcError| CalcError::playback(definition.tag.to_string(), index, err);
        for (index, op) in definition.ops.iter().enumerate() {
            match op {
                MacroOp::Value(value) => {
                    self.finalize_entry().map_err(|e| wrap(index, e))?;
                    self.push_value(value.clone()).map_err(|e| wrap(index, e))?;
                }
                MacroOp::Key(event) => {
                    self.queue.push_back(event.clone());
                    self.drain().map_err(|e| wrap(index, e))?;
                }
            }
        }
        let end = definition.ops.len();
        self.finalize_entry().map_err(|e| wrap(end, e))?;
        if self.contexts.is_modal() {
            return Err(wrap(
                end,
                CalcError::unsupported("macro ended inside a modal operation"),
            ));
        }
        Ok(())
    }
}
