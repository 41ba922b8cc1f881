//! # dimcalc engine
//!
//! **A unit-aware RPN calculator core**
//!
//! Values on the register stack carry a physical unit. Operators check and
//! combine units as they go: adding metres to feet converts, multiplying
//! metres by metres yields square metres, and adding metres to seconds is an
//! error that leaves the stack untouched.
//!
//! ## Quick Start
//!
//! ```rust
//! use dimcalc::{parse_keys, CalcResult, Engine};
//!
//! fn main() -> CalcResult<()> {
//!     let mut engine = Engine::new();
//!     let keys = parse_keys("5 [km] [mi]", engine.registry())?;
//!     engine.handle_events(keys)?;
//!
//!     let miles = engine.state().x().as_real().unwrap_or_default();
//!     assert!((miles - 3.10686).abs() < 1e-4);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Types
//! A [`TypeTag`] names a unit such as `km` or `m/s`. Composite units are
//! created on demand by multiplication, division and powers, and are
//! interned so equal units always get the same tag.
//!
//! ### Keys
//! Everything the engine does is driven by [`KeyEvent`]s. Operator keys go
//! through dispatch tables; the first entry whose register pattern matches
//! the stack runs.
//!
//! ### Macros
//! Keys can be recorded into macros and played back. A memory can be
//! computed by a macro, in which case it is re-evaluated whenever a memory
//! it reads changes.

pub mod algebra;
pub mod analysis;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keys;
pub mod macros;
pub mod parser;
pub mod resource_limits;
pub mod serializers;
pub mod undo;
pub mod value;

pub use algebra::{Conversion, RegistrySnapshot, TypeRegistry, TypeTag};
pub use context::{ContextKind, ModalOp};
pub use dispatch::DispatchTables;
pub use engine::{Engine, NumberEntry, Outcome};
pub use error::CalcError;
pub use keys::{KeyCode, KeyEvent, OpCode};
pub use macros::{Macro, MacroLibrary, MacroModule, MacroOp, MacroOpSeq};
pub use parser::{parse_keys, Span};
pub use resource_limits::ResourceLimits;
pub use serializers::Snapshot;
pub use value::{CalcState, FormatStyle, MemoryEntry, Shape, SymbolTag, TaggedValue, ValueKind};

/// Result type for calculator operations
pub type CalcResult<T> = Result<T, CalcError>;

#[cfg(test)]
mod tests;
