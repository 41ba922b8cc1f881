//! Memories, locals and computed memories

use super::{Engine, Outcome};
use crate::analysis::DependencyGraph;
use crate::value::{SymbolTag, TaggedValue};
use crate::{CalcError, CalcResult};
use tracing::debug;

impl Engine {
    /// Store X into a local when one is visible, otherwise into a memory.
    /// Computed memories that read the memory are re-evaluated.
    pub(super) fn store(&mut self, symbol: &SymbolTag) -> CalcResult<Outcome> {
        let value = self.state.x().clone();
        if self.locals.assign(symbol, value.clone()) {
            return Ok(Outcome::StateChanged);
        }
        if self.state.memory(symbol).is_some_and(|m| m.is_computed()) {
            return Err(CalcError::unsupported(format!(
                "'{}' is computed and cannot be stored to",
                symbol
            )));
        }
        self.transaction(|engine| {
            engine.state.set_memory(symbol, value);
            engine.register_dependents(symbol)?;
            engine.propagate(symbol)
        })
    }

    pub(super) fn recall(&mut self, symbol: &SymbolTag) -> CalcResult<Outcome> {
        let value = self
            .locals
            .lookup(symbol)
            .or_else(|| self.state.memory(symbol).map(|m| &m.value))
            .cloned()
            .ok_or_else(|| CalcError::UnknownSymbol(symbol.to_string()))?;
        self.push_value(value)
    }

    /// Declare a local in the innermost playback or recording frame,
    /// initialised from X
    pub(super) fn declare_local(&mut self, symbol: SymbolTag) -> CalcResult<Outcome> {
        let value = self.state.x().clone();
        if !self.locals.declare(symbol.clone(), value) {
            return Err(CalcError::unsupported(format!(
                "local '{}' declared outside a macro or recording",
                symbol
            )));
        }
        Ok(Outcome::StateChanged)
    }

    /// Turn `symbol` into a memory computed by the macro of the same name
    pub(super) fn compute(&mut self, symbol: &SymbolTag) -> CalcResult<Outcome> {
        let definition = self
            .library
            .find(symbol)
            .ok_or_else(|| CalcError::UnknownSymbol(symbol.to_string()))?;
        let reads = definition.ops.recalled_symbols();

        let mut graph = DependencyGraph::from_memories(&self.state);
        for dependency in &reads {
            graph.add_edge(dependency, symbol)?;
        }

        self.transaction(|engine| {
            let value = engine.evaluate_computed(symbol)?;
            let entry = engine.state.set_memory(symbol, value);
            entry.computed_by = Some(symbol.clone());
            for dependency in &reads {
                if let Some(memory) = engine.state.memory_mut(dependency) {
                    if !memory.dependents.contains(symbol) {
                        memory.dependents.push(symbol.clone());
                    }
                }
            }
            debug!(%symbol, dependencies = reads.len(), "computed memory defined");
            engine.propagate(symbol)
        })
    }

    /// Link `symbol` to every computed memory whose macro recalls it. Macros
    /// can be re-recorded, so this runs on each write.
    fn register_dependents(&mut self, symbol: &SymbolTag) -> CalcResult<()> {
        let readers: Vec<SymbolTag> = self
            .state
            .memories()
            .iter()
            .filter_map(|m| m.computed_by.clone())
            .filter(|tag| {
                self.library
                    .find(tag)
                    .is_some_and(|m| m.ops.recalled_symbols().contains(symbol))
            })
            .collect();
        if readers.is_empty() {
            return Ok(());
        }

        let mut graph = DependencyGraph::from_memories(&self.state);
        for reader in &readers {
            graph.add_edge(symbol, reader)?;
        }
        if let Some(memory) = self.state.memory_mut(symbol) {
            for reader in readers {
                if !memory.dependents.contains(&reader) {
                    memory.dependents.push(reader);
                }
            }
        }
        Ok(())
    }

    /// Re-evaluate everything downstream of `symbol`, dependencies first
    fn propagate(&mut self, symbol: &SymbolTag) -> CalcResult<()> {
        let order = DependencyGraph::from_memories(&self.state).propagation_order(symbol)?;
        for dependent in order {
            let Some(macro_tag) = self
                .state
                .memory(&dependent)
                .and_then(|m| m.computed_by.clone())
            else {
                continue;
            };
            let value = self.evaluate_computed(&macro_tag)?;
            debug!(symbol = %dependent, "recomputed");
            if let Some(memory) = self.state.memory_mut(&dependent) {
                memory.value = value;
            }
        }
        Ok(())
    }

    /// Play the macro on a scratch copy of the state and take its X
    fn evaluate_computed(&mut self, macro_tag: &SymbolTag) -> CalcResult<TaggedValue> {
        let saved = self.state.clone();
        self.undo.pause();
        self.recorder.pause();
        let result = self.play(macro_tag);
        self.undo.resume();
        self.recorder.resume();
        let value = self.state.x().clone();
        self.state = saved;
        result.map(|_| value)
    }
}
