use serde::{Deserialize, Serialize};

/// Resource limits for a single calculator instance
///
/// These bound every structure that can grow from user input. The defaults are
/// generous enough for interactive use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Number of registers in the stack (X, Y, Z, T, ...)
    pub register_count: usize,

    /// Maximum number of retained undo states; the oldest is dropped first
    pub max_undo_depth: usize,

    /// Maximum number of type definitions the registry may hold, builtins included
    /// Composite types are interned on demand, so this caps registry growth
    pub max_interned_types: usize,

    /// Maximum nesting of macro playback (a macro playing a macro ...)
    pub max_playback_depth: usize,

    /// Maximum number of events processed for one external key press,
    /// requeued events included
    pub max_event_drain: usize,

    /// Maximum number of elements in a row, column or matrix
    pub max_array_elements: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            register_count: 8,
            max_undo_depth: 100,
            max_interned_types: 4096,
            max_playback_depth: 32,
            max_event_drain: 1024,
            max_array_elements: 10_000,
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Same limits with a different stack size; at least four registers are kept
    pub fn with_registers(mut self, register_count: usize) -> Self {
        self.register_count = register_count.max(4);
        self
    }
}
