//! The calculator engine
//!
//! [`Engine::handle_event`] is the single entry point. Every key goes through
//! a FIFO queue so a context that cannot use a key can hand it on to the
//! next one; the queue is drained before the call returns.
//!
//! Every state change runs as a transaction: the pre-state goes on the undo
//! stack first and is put back if anything fails, so an error never leaves a
//! partially updated stack behind.

mod entry;
mod memory;
mod modal;
mod playback;

pub use entry::NumberEntry;

use crate::algebra::{TypeRegistry, TypeTag};
use crate::context::{ContextKind, ContextStack, Continuation};
use crate::dispatch::DispatchTables;
use crate::keys::{KeyCode, KeyEvent, OpCode};
use crate::macros::{LocalFrames, MacroLibrary, MacroOp, Recorder, RollbackPoint};
use crate::serializers::Snapshot;
use crate::undo::UndoStack;
use crate::value::{CalcState, FormatStyle, SymbolTag, TaggedValue};
use crate::{CalcError, CalcResult, ResourceLimits};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, error, trace, warn};

/// Magnitude from which a decimal display switches to scientific
const SCIENTIFIC_FROM: f64 = 1e13;
/// Magnitude below which a scientific display switches back to decimal
const DECIMAL_BELOW: f64 = 1e3;

/// What a successfully handled key did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    StateChanged,
    NoOp,
    /// A number is being typed or a modal operation waits for its key
    AwaitingInput,
    UndoPerformed,
}

/// The unit-aware RPN calculator engine.
pub struct Engine {
    registry: TypeRegistry,
    tables: DispatchTables,
    state: CalcState,
    undo: UndoStack,
    contexts: ContextStack,
    recorder: Recorder,
    library: MacroLibrary,
    locals: LocalFrames,
    entry: Option<NumberEntry>,
    queue: VecDeque<KeyEvent>,
    limits: ResourceLimits,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_limits(ResourceLimits::default())
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            registry: TypeRegistry::with_limits(&limits),
            tables: DispatchTables::new(),
            state: CalcState::new(limits.register_count),
            undo: UndoStack::new(limits.max_undo_depth),
            contexts: ContextStack::new(),
            recorder: Recorder::new(),
            library: MacroLibrary::new(),
            locals: LocalFrames::new(),
            entry: None,
            queue: VecDeque::new(),
            limits,
        }
    }

    /// Get the current resource limits
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn state(&self) -> &CalcState {
        &self.state
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mutable registry, for defining dimensions and types
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn tables(&self) -> &DispatchTables {
        &self.tables
    }

    /// Mutable dispatch tables, for registering extra operators
    pub fn tables_mut(&mut self) -> &mut DispatchTables {
        &mut self.tables
    }

    pub fn library(&self) -> &MacroLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut MacroLibrary {
        &mut self.library
    }

    /// The number being typed, if any
    pub fn entry(&self) -> Option<&NumberEntry> {
        self.entry.as_ref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.depth()
    }

    pub fn active_context(&self) -> &ContextKind {
        self.contexts.active()
    }

    pub fn context_depth(&self) -> usize {
        self.contexts.depth()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Persistable parts of the engine
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            registry: self.registry.snapshot(),
            modules: self.library.modules().to_vec(),
            bindings: self.library.bindings().clone(),
        }
    }

    /// Replace the persistable parts. Undo history, contexts, any recording
    /// and the number being typed are discarded.
    pub fn restore(&mut self, snapshot: Snapshot) -> CalcResult<()> {
        if snapshot.state.register_count() != self.state.register_count() {
            return Err(CalcError::Serialization(format!(
                "snapshot has {} registers, engine has {}",
                snapshot.state.register_count(),
                self.state.register_count()
            )));
        }
        self.registry.restore(&snapshot.registry)?;
        self.state = snapshot.state;
        self.library = MacroLibrary::from_parts(snapshot.modules, snapshot.bindings);
        self.undo.clear();
        self.contexts = ContextStack::new();
        self.recorder.cancel();
        self.locals = LocalFrames::new();
        self.entry = None;
        self.queue.clear();
        Ok(())
    }

    /// Handle one key press, including every key it requeues
    pub fn handle_event(&mut self, event: KeyEvent) -> CalcResult<Outcome> {
        self.queue.push_back(event);
        let result = self.drain();
        if result.is_err() {
            self.queue.clear();
        }
        result
    }

    /// Feed a sequence of keys, stopping at the first error
    pub fn handle_events(&mut self, events: impl IntoIterator<Item = KeyEvent>) -> CalcResult<Outcome> {
        let mut outcome = Outcome::NoOp;
        for event in events {
            outcome = self.handle_event(event)?;
        }
        Ok(outcome)
    }

    /// Process queued keys until the queue is empty; the last key's outcome
    /// is returned
    fn drain(&mut self) -> CalcResult<Outcome> {
        let mut outcome = Outcome::NoOp;
        let mut drained = 0;
        while let Some(event) = self.queue.pop_front() {
            drained += 1;
            if drained > self.limits.max_event_drain {
                warn!(limit = self.limits.max_event_drain, "event queue did not settle");
                return Err(CalcError::limit(
                    "max_event_drain",
                    self.limits.max_event_drain,
                ));
            }
            trace!(key = ?event.key, queued = self.queue.len(), "draining event");
            outcome = self.route(event)?;
        }
        Ok(outcome)
    }

    fn route(&mut self, event: KeyEvent) -> CalcResult<Outcome> {
        // Editing the number being typed
        if self.entry.is_some() {
            match event.key {
                KeyCode::Backspace => return Ok(self.entry_backspace()),
                KeyCode::Undo => {
                    self.entry = None;
                    return Ok(Outcome::StateChanged);
                }
                _ => {}
            }
        }
        if !self.contexts.is_modal() {
            match event.key {
                key if key.is_entry() => return self.entry_key(key),
                KeyCode::ChangeSign if self.entry.is_some() => return self.entry_key(event.key),
                KeyCode::Unit(tag) if self.entry_accepts_unit() => {
                    if let Some(entry) = self.entry.as_mut() {
                        entry.set_tag(tag);
                    }
                    return Ok(Outcome::AwaitingInput);
                }
                KeyCode::Undo if self.recorder.is_active() => return self.record_rollback(false),
                KeyCode::Backspace if self.recorder.is_active() => return self.record_rollback(true),
                KeyCode::Undo => return Ok(self.undo()),
                _ => {}
            }
        }

        self.finalize_entry()?;

        let point = self.rollback_point();
        if self.contexts.is_modal() {
            return self.modal_route(event, point);
        }
        let recordable = !matches!(
            event.key,
            KeyCode::RecordStart | KeyCode::RecordStop | KeyCode::Backspace
        );
        let outcome = self.execute(&event)?;
        if recordable {
            self.recorder.record(MacroOp::Key(event), point);
        }
        Ok(outcome)
    }

    /// Act on a key in the normal or playback context
    fn execute(&mut self, event: &KeyEvent) -> CalcResult<Outcome> {
        match event.key {
            KeyCode::Enter => self.transact(|_, state| {
                let mut next = state.clone();
                next.no_lift = false;
                next.stack_lift();
                next.no_lift = true;
                Ok(next)
            }),
            KeyCode::Clear | KeyCode::Backspace => self.transact(|_, state| {
                let mut next = state.clone();
                next.set_x(TaggedValue::default());
                next.no_lift = true;
                Ok(next)
            }),
            KeyCode::ChangeSign => self.apply_op(OpCode::Negate),
            KeyCode::Op(op) => self.apply_op(op),
            KeyCode::Unit(tag) => self.transaction(|engine| {
                engine.state = engine.tables.convert(&engine.registry, &engine.state, tag)?;
                Ok(())
            }),
            KeyCode::Store => {
                let symbol = self.required_symbol(event)?;
                self.store(&symbol)
            }
            KeyCode::Recall => {
                let symbol = self.required_symbol(event)?;
                self.recall(&symbol)
            }
            KeyCode::Local => {
                let symbol = self.required_symbol(event)?;
                self.declare_local(symbol)
            }
            KeyCode::Compute => {
                let symbol = self.required_symbol(event)?;
                self.compute(&symbol)
            }
            KeyCode::Play => {
                let symbol = self.required_symbol(event)?;
                self.play(&symbol)
            }
            KeyCode::User(n) => match self.library.binding(n).cloned() {
                Some(symbol) => self.play(&symbol),
                None => {
                    error!(key = n, "user key has no macro bound");
                    Err(CalcError::UnknownSymbol(format!("user key {}", n)))
                }
            },
            KeyCode::RecordStart => {
                let symbol = self.required_symbol(event)?;
                self.start_recording(symbol)
            }
            KeyCode::RecordStop => Ok(self.stop_recording()),
            KeyCode::Map | KeyCode::Reduce | KeyCode::Sequence => self.start_modal(event.key),
            KeyCode::Undo => Ok(self.undo()),
            KeyCode::Digit(_) | KeyCode::Point | KeyCode::Exponent => self.entry_key(event.key),
        }
    }

    fn required_symbol(&self, event: &KeyEvent) -> CalcResult<SymbolTag> {
        event.symbol.clone().ok_or_else(|| {
            error!(key = ?event.key, "key sent without its symbol");
            CalcError::unsupported(format!("{:?} needs a symbol", event.key))
        })
    }

    fn apply_op(&mut self, op: OpCode) -> CalcResult<Outcome> {
        self.transaction(|engine| {
            engine.state = engine.tables.apply(&mut engine.registry, &engine.state, op)?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Run a pure transition as a transaction
    fn transact(
        &mut self,
        f: impl FnOnce(&mut TypeRegistry, &CalcState) -> CalcResult<CalcState>,
    ) -> CalcResult<Outcome> {
        self.transaction(|engine| {
            engine.state = f(&mut engine.registry, &engine.state)?;
            Ok(())
        })
    }

    /// Run `f` against the engine; on failure the state and undo stack are
    /// put back exactly as they were
    fn transaction(&mut self, f: impl FnOnce(&mut Engine) -> CalcResult<()>) -> CalcResult<Outcome> {
        let pre_state = self.state.clone();
        self.undo.push(pre_state.clone());
        match f(self)
            .and_then(|()| self.check_arrays())
            .and_then(|()| self.check_finite())
        {
            Ok(()) => {
                settle_display(&mut self.state);
                Ok(Outcome::StateChanged)
            }
            Err(err) => {
                self.state = pre_state;
                self.undo.pop_discard();
                warn!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    fn check_arrays(&self) -> CalcResult<()> {
        let max = self.limits.max_array_elements;
        if self.state.registers().iter().any(|value| value.len() > max) {
            warn!(limit = max, "array too large");
            return Err(CalcError::limit("max_array_elements", max));
        }
        Ok(())
    }

    /// Overflowed results never reach the stack
    fn check_finite(&self) -> CalcResult<()> {
        let x = self.state.x();
        if x.data().iter().all(|v| v.is_finite()) {
            return Ok(());
        }
        Err(CalcError::domain(format!(
            "{} result is not finite",
            x.kind().name()
        )))
    }

    fn undo(&mut self) -> Outcome {
        match self.undo.pop() {
            Some(state) => {
                debug!(depth = self.undo.depth(), "undo");
                self.state = state;
                Outcome::UndoPerformed
            }
            None => Outcome::NoOp,
        }
    }

    // ------------------------------------------------------------------
    // Contexts
    // ------------------------------------------------------------------

    /// Leave the active context; the resumed context's continuation runs
    /// unless `suppress` is set
    pub(crate) fn pop_context(&mut self, suppress: bool) -> CalcResult<()> {
        if let Some((kind, continuation)) = self.contexts.pop() {
            debug!(context = kind.name(), suppress, "left context");
            if let Some(continuation) = continuation.filter(|_| !suppress) {
                continuation(self)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    fn start_recording(&mut self, symbol: SymbolTag) -> CalcResult<Outcome> {
        if self.contexts.playback_depth() > 0 {
            return Err(CalcError::unsupported("cannot record during playback"));
        }
        if self.recorder.is_recording() {
            self.locals.pop();
        }
        debug!(%symbol, "recording");
        self.recorder.start(symbol);
        // Locals declared while recording live until the recording stops
        self.locals.push();
        Ok(Outcome::StateChanged)
    }

    fn stop_recording(&mut self) -> Outcome {
        match self.recorder.stop() {
            Some(recorded) => {
                self.locals.pop();
                debug!(symbol = %recorded.tag, steps = recorded.ops.len(), "recorded");
                if !self.library.insert(recorded) {
                    warn!("recorded macro names a missing module; discarded");
                }
                Outcome::StateChanged
            }
            None => Outcome::NoOp,
        }
    }

    fn rollback_point(&self) -> RollbackPoint {
        RollbackPoint {
            state: self.state.clone(),
            contexts: self.contexts.snapshot(),
            undo_depth: self.undo.depth(),
            locals: self.locals.clone(),
        }
    }

    /// Take back the last recorded entry. Backspace first strips a unit from
    /// a recorded number; undo always removes the whole entry.
    fn record_rollback(&mut self, backspace: bool) -> CalcResult<Outcome> {
        if backspace {
            if let Some(MacroOp::Value(value)) = self.recorder.last_mut() {
                if !value.tag().is_untyped() {
                    value.set_tag(TypeTag::UNTYPED);
                    self.state.x_mut().set_tag(TypeTag::UNTYPED);
                    return Ok(Outcome::StateChanged);
                }
            }
        }
        let Some((op, point)) = self.recorder.rollback_last() else {
            return Ok(Outcome::NoOp);
        };
        debug!(?op, "removed recorded entry");
        self.state = point.state;
        self.undo.truncate(point.undo_depth);
        self.locals = point.locals;
        self.contexts.restore(&point.contexts, continuation_for);
        Ok(Outcome::StateChanged)
    }
}

/// Continuation a frame needs while `pushed` runs on top of it
fn continuation_for(pushed: &ContextKind) -> Option<Continuation> {
    let continuation: Continuation = match pushed {
        ContextKind::Normal => return None,
        ContextKind::Playback { .. } => Box::new(|engine: &mut Engine| {
            engine.locals.pop();
            Ok(())
        }),
        ContextKind::Modal(_) => Box::new(|engine: &mut Engine| {
            settle_display(&mut engine.state);
            Ok(())
        }),
    };
    Some(continuation)
}

/// Switch the display style of X when its magnitude leaves the range of the
/// current style
fn settle_display(state: &mut CalcState) {
    let x = state.x_mut();
    let Some(magnitude) = x.display_magnitude() else {
        return;
    };
    let mut format = x.format();
    format.style = match format.style {
        FormatStyle::Decimal if magnitude >= SCIENTIFIC_FROM => FormatStyle::Scientific,
        FormatStyle::Scientific if magnitude < DECIMAL_BELOW => FormatStyle::Decimal,
        style => style,
    };
    x.set_format(format);
}
