//! Key events accepted by the engine

use crate::algebra::TypeTag;
use crate::value::SymbolTag;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opcodes {
    ($($variant:ident => $name:literal, $arity:literal;)*) => {
        /// Operator keys resolved through the dispatch tables
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum OpCode {
            $($variant,)*
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Script name of the operator
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }

            /// Number of registers the operator consumes
            pub fn arity(self) -> usize {
                match self {
                    $(OpCode::$variant => $arity,)*
                }
            }
        }
    };
}

opcodes! {
    Add => "add", 2;
    Subtract => "sub", 2;
    Multiply => "mul", 2;
    Divide => "div", 2;
    Power => "pow", 2;
    Sqrt => "sqrt", 1;
    Square => "sq", 1;
    Reciprocal => "inv", 1;
    Negate => "neg", 1;
    Abs => "abs", 1;
    Sin => "sin", 1;
    Cos => "cos", 1;
    Tan => "tan", 1;
    Asin => "asin", 1;
    Acos => "acos", 1;
    Atan => "atan", 1;
    Ln => "ln", 1;
    Exp => "exp", 1;
    Log10 => "log", 1;
    Pow10 => "alog", 1;
    NthRoot => "root", 2;
    Pi => "pi", 0;
    E => "e", 0;
    ToRadians => "to-rad", 1;
    ToDegrees => "to-deg", 1;
    Swap => "swap", 0;
    Drop => "drop", 0;
    Roll => "roll", 0;
    RollUp => "roll-up", 0;
    Dup => "dup", 0;
    LastX => "last-x", 0;
    MakeComplex => "cplx", 2;
    MakeVector2 => "vec2", 2;
    MakeVector3 => "vec3", 3;
    Fraction => "frac", 1;
    ToPolar => "to-polar", 1;
    ToRect => "to-rect", 1;
    Split => "split", 1;
    Dot => "dot", 2;
    Cross => "cross", 2;
    Concat => "concat", 2;
    Stack => "stack", 2;
    Transpose => "trn", 1;
}

impl OpCode {
    pub fn from_name(name: &str) -> Option<OpCode> {
        match name {
            "+" => Some(OpCode::Add),
            "-" => Some(OpCode::Subtract),
            "*" => Some(OpCode::Multiply),
            "/" => Some(OpCode::Divide),
            "^" => Some(OpCode::Power),
            _ => OpCode::ALL.iter().copied().find(|op| op.name() == name),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "key", content = "arg")]
pub enum KeyCode {
    Digit(u8),
    Point,
    Exponent,
    ChangeSign,
    Enter,
    Backspace,
    Clear,
    Undo,
    Op(OpCode),
    Unit(TypeTag),
    Store,
    Recall,
    Local,
    Play,
    RecordStart,
    RecordStop,
    Map,
    Reduce,
    Sequence,
    Compute,
    User(u8),
}

impl KeyCode {
    /// Keys that edit the number being typed
    pub fn is_entry(self) -> bool {
        matches!(
            self,
            KeyCode::Digit(_) | KeyCode::Point | KeyCode::Exponent
        )
    }

    /// Keys that start a modal operation
    pub fn opens_modal(self) -> bool {
        matches!(self, KeyCode::Map | KeyCode::Reduce | KeyCode::Sequence)
    }

    /// Keys that take a symbol parameter
    pub fn needs_symbol(self) -> bool {
        matches!(
            self,
            KeyCode::Store
                | KeyCode::Recall
                | KeyCode::Local
                | KeyCode::Play
                | KeyCode::RecordStart
                | KeyCode::Compute
        )
    }
}

/// One discrete input: a key code plus an optional symbol parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: KeyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolTag>,
}

impl KeyEvent {
    pub fn new(key: KeyCode) -> Self {
        Self { key, symbol: None }
    }

    pub fn with_symbol(key: KeyCode, symbol: impl Into<SymbolTag>) -> Self {
        Self {
            key,
            symbol: Some(symbol.into()),
        }
    }

    pub fn op(op: OpCode) -> Self {
        Self::new(KeyCode::Op(op))
    }

    pub fn unit(tag: TypeTag) -> Self {
        Self::new(KeyCode::Unit(tag))
    }

    pub fn digit(digit: u8) -> Self {
        Self::new(KeyCode::Digit(digit))
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(key: KeyCode) -> Self {
        Self::new(key)
    }
}
