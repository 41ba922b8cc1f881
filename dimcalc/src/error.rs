use crate::parser::Span;
use thiserror::Error;

/// Error types for the calculator core.
///
/// Every variant describes a failed transition: the operation produced no new
/// state and the engine is back in its last valid state when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// Operands fail every pattern's shape/type spec
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Dimensional analysis failed for an arithmetic operator
    #[error("Incompatible units: {0}")]
    IncompatibleUnits(String),

    /// No conversion path between two units
    #[error("Undefined conversion from '{from}' to '{to}'")]
    UndefinedConversion { from: String, to: String },

    /// Structural operation on the wrong rank or arity
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// An entry inside a macro failed during playback
    #[error("Macro '{tag}' failed at step {index}: {source}")]
    MacroPlaybackFailure {
        tag: String,
        index: usize,
        source: Box<CalcError>,
    },

    /// Recall of an undefined memory or macro
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Numeric domain violation inside a matched operator (division by zero, ...)
    #[error("Domain error: {0}")]
    Domain(String),

    /// A computed memory would (transitively) depend on itself
    #[error("Circular dependency: {0}")]
    CyclicDependency(String),

    #[error("Resource limit exceeded: {limit_name} (limit {limit_value})")]
    LimitExceeded {
        limit_name: String,
        limit_value: String,
    },

    /// Key is valid but not usable in the current context
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Key-script parse error with source location
    #[error("Parse error: {message} at {}:{}", span.line, span.col)]
    Parse { message: String, span: Span },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalcError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn incompatible_units(message: impl Into<String>) -> Self {
        Self::IncompatibleUnits(message.into())
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeError(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn limit(limit_name: impl Into<String>, limit_value: impl ToString) -> Self {
        Self::LimitExceeded {
            limit_name: limit_name.into(),
            limit_value: limit_value.to_string(),
        }
    }

    /// Wrap a failure that happened while replaying `tag` at `index`
    pub fn playback(tag: impl Into<String>, index: usize, source: CalcError) -> Self {
        Self::MacroPlaybackFailure {
            tag: tag.into(),
            index,
            source: Box::new(source),
        }
    }

    /// The innermost error of a chain of macro playback failures
    pub fn root_cause(&self) -> &CalcError {
        match self {
            CalcError::MacroPlaybackFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::Serialization(err.to_string())
    }
}
