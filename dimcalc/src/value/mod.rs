//! Tagged values and the register stack

mod state;
mod symbol;
mod tagged;

pub use state::{CalcState, MemoryEntry};
pub use symbol::SymbolTag;
pub use tagged::{FormatRecord, FormatStyle, Shape, TaggedValue, ValueKind};
