use super::{SymbolTag, TaggedValue};
use serde::{Deserialize, Serialize};

/// A named memory; computed memories are produced by the macro `computed_by`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub symbol: SymbolTag,
    pub value: TaggedValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_by: Option<SymbolTag>,
    /// Computed memories to re-evaluate when this one is written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<SymbolTag>,
}

impl MemoryEntry {
    pub fn new(symbol: SymbolTag, value: TaggedValue) -> Self {
        Self {
            symbol,
            value,
            computed_by: None,
            dependents: Vec::new(),
        }
    }

    pub fn is_computed(&self) -> bool {
        self.computed_by.is_some()
    }
}

/// Register stack and memories of one calculator.
///
/// Register 0 is X, 1 is Y and so on. The stack never changes length;
/// lifting and dropping shift values between slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcState {
    registers: Vec<TaggedValue>,
    pub last_x: TaggedValue,
    pub no_lift: bool,
    memories: Vec<MemoryEntry>,
}

impl Default for CalcState {
    fn default() -> Self {
        Self::new(crate::ResourceLimits::default().register_count)
    }
}

impl CalcState {
    pub fn new(register_count: usize) -> Self {
        Self {
            registers: vec![TaggedValue::default(); register_count.max(1)],
            last_x: TaggedValue::default(),
            no_lift: false,
            memories: Vec::new(),
        }
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn registers(&self) -> &[TaggedValue] {
        &self.registers
    }

    pub fn register(&self, index: usize) -> Option<&TaggedValue> {
        self.registers.get(index)
    }

    pub fn x(&self) -> &TaggedValue {
        &self.registers[0]
    }

    pub fn y(&self) -> Option<&TaggedValue> {
        self.registers.get(1)
    }

    pub fn z(&self) -> Option<&TaggedValue> {
        self.registers.get(2)
    }

    pub fn t(&self) -> Option<&TaggedValue> {
        self.registers.get(3)
    }

    pub fn x_mut(&mut self) -> &mut TaggedValue {
        &mut self.registers[0]
    }

    pub fn set_x(&mut self, value: TaggedValue) {
        self.registers[0] = value;
    }

    /// Replace a register; out of range indexes are ignored
    pub fn set_register(&mut self, index: usize, value: TaggedValue) {
        if let Some(slot) = self.registers.get_mut(index) {
            *slot = value;
        }
    }

    /// Shift every register up one slot, duplicating X; the top value is lost.
    ///
    /// When `no_lift` is set the flag is consumed instead and nothing moves.
    pub fn stack_lift(&mut self) {
        if self.no_lift {
            self.no_lift = false;
            return;
        }
        self.registers.rotate_right(1);
        self.registers[0] = self.registers[1].clone();
    }

    /// Lift and place `value` in X
    pub fn push(&mut self, value: TaggedValue) {
        self.stack_lift();
        self.set_x(value);
    }

    /// Shift every register down one slot, discarding X; the top slot keeps
    /// its value.
    pub fn stack_drop(&mut self) {
        let top = self.registers.len() - 1;
        self.registers.rotate_left(1);
        if top > 0 {
            self.registers[top] = self.registers[top - 1].clone();
        }
    }

    /// Move X to the deepest slot of the stack
    pub fn stack_roll(&mut self) {
        self.registers.rotate_left(1);
    }

    /// Move the deepest slot to X
    pub fn stack_roll_up(&mut self) {
        self.registers.rotate_right(1);
    }

    pub fn swap_xy(&mut self) {
        if self.registers.len() > 1 {
            self.registers.swap(0, 1);
        }
    }

    // ------------------------------------------------------------------
    // Memories
    // ------------------------------------------------------------------

    pub fn memories(&self) -> &[MemoryEntry] {
        &self.memories
    }

    pub fn memory(&self, symbol: &SymbolTag) -> Option<&MemoryEntry> {
        self.memories.iter().find(|m| &m.symbol == symbol)
    }

    pub fn memory_mut(&mut self, symbol: &SymbolTag) -> Option<&mut MemoryEntry> {
        self.memories.iter_mut().find(|m| &m.symbol == symbol)
    }

    /// Write a memory, creating it on first use
    pub fn set_memory(&mut self, symbol: &SymbolTag, value: TaggedValue) -> &mut MemoryEntry {
        match self.memories.iter().position(|m| &m.symbol == symbol) {
            Some(index) => {
                self.memories[index].value = value;
                &mut self.memories[index]
            }
            None => {
                self.memories.push(MemoryEntry::new(symbol.clone(), value));
                let last = self.memories.len() - 1;
                &mut self.memories[last]
            }
        }
    }

    pub fn remove_memory(&mut self, symbol: &SymbolTag) -> Option<MemoryEntry> {
        let index = self.memories.iter().position(|m| &m.symbol == symbol)?;
        Some(self.memories.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(values: &[f64]) -> CalcState {
        let mut state = CalcState::new(4);
        for (i, v) in values.iter().enumerate() {
            state.set_register(i, TaggedValue::real(*v));
        }
        state
    }

    fn reals(state: &CalcState) -> Vec<f64> {
        state
            .registers()
            .iter()
            .map(|r| r.as_real().unwrap())
            .collect()
    }

    #[test]
    fn lift_duplicates_x_and_loses_top() {
        let mut state = stack(&[1.0, 2.0, 3.0, 4.0]);
        state.stack_lift();
        assert_eq!(reals(&state), vec![1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn lift_consumes_no_lift_flag() {
        let mut state = stack(&[1.0, 2.0, 3.0, 4.0]);
        state.no_lift = true;
        state.stack_lift();
        assert!(!state.no_lift);
        assert_eq!(reals(&state), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn drop_duplicates_top() {
        let mut state = stack(&[1.0, 2.0, 3.0, 4.0]);
        state.stack_drop();
        assert_eq!(reals(&state), vec![2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn roll_moves_x_to_the_bottom_of_the_whole_stack() {
        let mut state = stack(&[1.0, 2.0, 3.0, 4.0]);
        state.stack_roll();
        assert_eq!(reals(&state), vec![2.0, 3.0, 4.0, 1.0]);
        state.stack_roll_up();
        assert_eq!(reals(&state), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn memories_are_unique_per_symbol() {
        let mut state = CalcState::new(4);
        let a = SymbolTag::new("a");
        state.set_memory(&a, TaggedValue::real(1.0));
        state.set_memory(&a, TaggedValue::real(2.0));
        assert_eq!(state.memories().len(), 1);
        assert_eq!(state.memory(&a).unwrap().value.as_real(), Some(2.0));
    }
}
