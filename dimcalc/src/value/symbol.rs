use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a memory or macro.
///
/// `split` marks where a subscript starts (`x_1` is stored as `x1` split at
/// 1). `module` scopes the tag; tags are unique within a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolTag {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<u8>,
    #[serde(default)]
    pub module: u16,
}

impl SymbolTag {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            split: None,
            module: 0,
        }
    }

    /// Parse `name` or `name_sub` into a tag in module 0
    pub fn parse(source: &str) -> Self {
        match source.find('_') {
            Some(pos) if pos > 0 && pos + 1 < source.len() && pos <= u8::MAX as usize => Self {
                text: format!("{}{}", &source[..pos], &source[pos + 1..]),
                split: Some(pos as u8),
                module: 0,
            },
            _ => Self::new(source),
        }
    }

    pub fn in_module(mut self, module: u16) -> Self {
        self.module = module;
        self
    }

    /// Main part and subscript
    pub fn parts(&self) -> (&str, &str) {
        match self.split {
            Some(split) if self.text.is_char_boundary(split as usize) => {
                self.text.split_at(split as usize)
            }
            _ => (&self.text, ""),
        }
    }
}

impl fmt::Display for SymbolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            (main, "") => write!(f, "{}", main),
            (main, sub) => write!(f, "{}_{}", main, sub),
        }
    }
}

impl From<&str> for SymbolTag {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscript_split_roundtrips_through_display() {
        let tag = SymbolTag::parse("x_12");
        assert_eq!(tag.text, "x12");
        assert_eq!(tag.split, Some(1));
        assert_eq!(tag.parts(), ("x", "12"));
        assert_eq!(tag.to_string(), "x_12");
    }

    #[test]
    fn leading_or_trailing_underscore_is_plain_text() {
        assert_eq!(SymbolTag::parse("_x").split, None);
        assert_eq!(SymbolTag::parse("x_").split, None);
        assert_eq!(SymbolTag::parse("rate").to_string(), "rate");
    }
}
