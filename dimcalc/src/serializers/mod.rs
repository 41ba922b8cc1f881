//! Persistence shape
//!
//! A [`Snapshot`] holds everything that outlives a session: the register
//! stack and memories, the registry definitions created at runtime, and the
//! macro library. Undo history and open contexts are not part of it.

pub mod json;

pub use json::{from_json, to_json};

use crate::algebra::RegistrySnapshot;
use crate::macros::MacroModule;
use crate::value::{CalcState, SymbolTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CalcState,
    #[serde(default)]
    pub registry: RegistrySnapshot,
    #[serde(default)]
    pub modules: Vec<MacroModule>,
    #[serde(default)]
    pub bindings: BTreeMap<u8, SymbolTag>,
}
