//! Macro storage
//!
//! A macro is an append-only sequence of recorded operations. Numbers typed
//! while recording are stored once, as finished values, rather than as the
//! digit keys that produced them.

mod locals;
mod recorder;

pub use locals::LocalFrames;
pub use recorder::{Recorder, RollbackPoint};

use crate::keys::{KeyCode, KeyEvent};
use crate::value::{SymbolTag, TaggedValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "lowercase")]
pub enum MacroOp {
    Key(KeyEvent),
    Value(TaggedValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroOpSeq(Vec<MacroOp>);

impl MacroOpSeq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: MacroOp) {
        self.0.push(op);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroOp> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&MacroOp> {
        self.0.get(index)
    }

    pub fn last(&self) -> Option<&MacroOp> {
        self.0.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut MacroOp> {
        self.0.last_mut()
    }

    /// Remove the last entry; only the recorder rolls back
    pub(crate) fn pop(&mut self) -> Option<MacroOp> {
        self.0.pop()
    }

    /// Symbols read by recall keys, in order of first appearance
    pub fn recalled_symbols(&self) -> Vec<SymbolTag> {
        let mut symbols: Vec<SymbolTag> = Vec::new();
        for op in &self.0 {
            if let MacroOp::Key(KeyEvent {
                key: KeyCode::Recall,
                symbol: Some(symbol),
            }) = op
            {
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
        }
        symbols
    }
}

impl FromIterator<MacroOp> for MacroOpSeq {
    fn from_iter<I: IntoIterator<Item = MacroOp>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub tag: SymbolTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub ops: MacroOpSeq,
}

impl Macro {
    pub fn new(tag: SymbolTag, ops: MacroOpSeq) -> Self {
        Self {
            tag,
            caption: None,
            ops,
        }
    }
}

/// Named group of macros; a tag's `module` indexes into the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroModule {
    pub symbol: SymbolTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub macros: Vec<Macro>,
}

impl MacroModule {
    pub fn new(symbol: SymbolTag) -> Self {
        Self {
            symbol,
            caption: None,
            macros: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroLibrary {
    modules: Vec<MacroModule>,
    /// User key number to macro
    bindings: BTreeMap<u8, SymbolTag>,
}

impl Default for MacroLibrary {
    fn default() -> Self {
        Self {
            modules: vec![MacroModule::new(SymbolTag::new("main"))],
            bindings: BTreeMap::new(),
        }
    }
}

impl MacroLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library from persisted parts; module 0 is created when missing
    pub fn from_parts(modules: Vec<MacroModule>, bindings: BTreeMap<u8, SymbolTag>) -> Self {
        let mut library = Self { modules, bindings };
        if library.modules.is_empty() {
            library.modules.push(MacroModule::new(SymbolTag::new("main")));
        }
        library
    }

    pub fn modules(&self) -> &[MacroModule] {
        &self.modules
    }

    pub fn bindings(&self) -> &BTreeMap<u8, SymbolTag> {
        &self.bindings
    }

    /// Add a module and return its index
    pub fn add_module(&mut self, module: MacroModule) -> u16 {
        self.modules.push(module);
        (self.modules.len() - 1) as u16
    }

    pub fn find(&self, tag: &SymbolTag) -> Option<&Macro> {
        self.modules
            .get(tag.module as usize)?
            .macros
            .iter()
            .find(|m| &m.tag == tag)
    }

    /// Store a macro, replacing one with the same tag.
    ///
    /// Returns `false` when the tag names a module that does not exist.
    pub fn insert(&mut self, m: Macro) -> bool {
        let Some(module) = self.modules.get_mut(m.tag.module as usize) else {
            return false;
        };
        match module.macros.iter_mut().find(|existing| existing.tag == m.tag) {
            Some(existing) => *existing = m,
            None => module.macros.push(m),
        }
        true
    }

    pub fn remove(&mut self, tag: &SymbolTag) -> Option<Macro> {
        let module = self.modules.get_mut(tag.module as usize)?;
        let index = module.macros.iter().position(|m| &m.tag == tag)?;
        Some(module.macros.remove(index))
    }

    pub fn bind(&mut self, key: u8, tag: SymbolTag) {
        self.bindings.insert(key, tag);
    }

    pub fn binding(&self, key: u8) -> Option<&SymbolTag> {
        self.bindings.get(&key)
    }
}
