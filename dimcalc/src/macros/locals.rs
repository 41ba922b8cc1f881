use crate::value::{SymbolTag, TaggedValue};

#[derive(Debug, Clone, Default, PartialEq)]
struct LocalFrame {
    parent: Option<usize>,
    variables: Vec<(SymbolTag, TaggedValue)>,
}

/// Local variable frames of nested macro playbacks and of the recording in
/// progress.
///
/// Frames live in an arena and link to the frame of the calling playback, so
/// a macro sees the locals of every macro that called it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFrames {
    frames: Vec<LocalFrame>,
    current: Option<usize>,
}

impl LocalFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(LocalFrame {
            parent: self.current,
            variables: Vec::new(),
        });
        self.current = Some(self.frames.len() - 1);
    }

    pub fn pop(&mut self) {
        if let Some(index) = self.current {
            self.current = self.frames[index].parent;
            self.frames.truncate(index);
        }
    }

    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    fn chain(&self) -> impl Iterator<Item = &LocalFrame> {
        std::iter::successors(self.current.map(|i| &self.frames[i]), |frame| {
            frame.parent.map(|i| &self.frames[i])
        })
    }

    /// Declare `symbol` in the innermost frame; `false` when there is none
    pub fn declare(&mut self, symbol: SymbolTag, value: TaggedValue) -> bool {
        let Some(frame) = self.current.and_then(|i| self.frames.get_mut(i)) else {
            return false;
        };
        match frame.variables.iter_mut().find(|(s, _)| *s == symbol) {
            Some((_, slot)) => *slot = value,
            None => frame.variables.push((symbol, value)),
        }
        true
    }

    /// Innermost visible binding of `symbol`
    pub fn lookup(&self, symbol: &SymbolTag) -> Option<&TaggedValue> {
        self.chain()
            .find_map(|frame| frame.variables.iter().find(|(s, _)| s == symbol))
            .map(|(_, value)| value)
    }

    /// Overwrite the innermost visible binding; `false` when none exists
    pub fn assign(&mut self, symbol: &SymbolTag, value: TaggedValue) -> bool {
        let mut next = self.current;
        while let Some(index) = next {
            let frame = &mut self.frames[index];
            if let Some((_, slot)) = frame.variables.iter_mut().find(|(s, _)| s == symbol) {
                *slot = value;
                return true;
            }
            next = frame.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_see_outer_locals() {
        let mut locals = LocalFrames::new();
        let a = SymbolTag::new("a");
        assert!(!locals.declare(a.clone(), TaggedValue::real(1.0)));

        locals.push();
        assert!(locals.declare(a.clone(), TaggedValue::real(1.0)));
        locals.push();
        assert_eq!(locals.lookup(&a), Some(&TaggedValue::real(1.0)));
        assert!(locals.assign(&a, TaggedValue::real(2.0)));
        assert_eq!(locals.depth(), 2);

        locals.pop();
        assert_eq!(locals.lookup(&a), Some(&TaggedValue::real(2.0)));
        locals.pop();
        assert_eq!(locals.lookup(&a), None);
        assert_eq!(locals.depth(), 0);
    }

    #[test]
    fn shadowed_local_hides_the_outer_one() {
        let mut locals = LocalFrames::new();
        let a = SymbolTag::new("a");
        locals.push();
        locals.declare(a.clone(), TaggedValue::real(1.0));
        locals.push();
        locals.declare(a.clone(), TaggedValue::real(5.0));
        assert_eq!(locals.lookup(&a), Some(&TaggedValue::real(5.0)));
        locals.pop();
        assert_eq!(locals.lookup(&a), Some(&TaggedValue::real(1.0)));
    }
}
