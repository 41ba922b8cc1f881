use super::{Engine, Outcome};
use crate::algebra::TypeTag;
use crate::keys::KeyCode;
use crate::macros::MacroOp;
use crate::value::TaggedValue;
use crate::{CalcError, CalcResult};
use std::fmt;

/// Number being typed, kept as text until it is finished
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberEntry {
    mantissa: String,
    negative: bool,
    exponent: Option<String>,
    exponent_negative: bool,
    tag: TypeTag,
}

impl NumberEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn set_tag(&mut self, tag: TypeTag) {
        self.tag = tag;
    }

    pub fn push_digit(&mut self, digit: u8) {
        let c = char::from(b'0' + digit.min(9));
        match self.exponent.as_mut() {
            Some(exponent) => exponent.push(c),
            None => self.mantissa.push(c),
        }
    }

    /// Decimal point; ignored in the exponent or when one is already typed
    pub fn push_point(&mut self) {
        if self.exponent.is_none() && !self.mantissa.contains('.') {
            self.mantissa.push('.');
        }
    }

    pub fn start_exponent(&mut self) {
        if self.exponent.is_none() {
            if self.mantissa.is_empty() {
                self.mantissa.push('1');
            }
            self.exponent = Some(String::new());
        }
    }

    /// Negate the exponent while it is being typed, the mantissa otherwise
    pub fn change_sign(&mut self) {
        if self.exponent.is_some() {
            self.exponent_negative = !self.exponent_negative;
        } else {
            self.negative = !self.negative;
        }
    }

    /// Remove the unit, else the last character. Returns `false` once
    /// nothing is left.
    pub fn backspace(&mut self) -> bool {
        if !self.tag.is_untyped() {
            self.tag = TypeTag::UNTYPED;
            return true;
        }
        match self.exponent.as_mut() {
            Some(exponent) => {
                if exponent.pop().is_none() {
                    self.exponent = None;
                    self.exponent_negative = false;
                }
            }
            None => {
                self.mantissa.pop();
            }
        }
        !self.mantissa.is_empty() || self.exponent.is_some()
    }

    pub fn value(&self) -> CalcResult<f64> {
        let mantissa = match self.mantissa.as_str() {
            "" | "." => "0",
            m => m,
        };
        let exponent = self.exponent.as_deref().filter(|e| !e.is_empty()).unwrap_or("0");
        let text = format!(
            "{}{}e{}{}",
            if self.negative { "-" } else { "" },
            mantissa,
            if self.exponent_negative { "-" } else { "" },
            exponent
        );
        let value: f64 = text
            .parse()
            .map_err(|_| CalcError::domain(format!("'{}' is not a number", text)))?;
        if !value.is_finite() {
            return Err(CalcError::domain(format!("{} is out of range", self)));
        }
        Ok(value)
    }

    pub fn to_value(&self) -> CalcResult<TaggedValue> {
        Ok(TaggedValue::typed(self.value()?, self.tag))
    }
}

impl fmt::Display for NumberEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.mantissa)?;
        if let Some(exponent) = &self.exponent {
            write!(f, "e{}{}", if self.exponent_negative { "-" } else { "" }, exponent)?;
        }
        Ok(())
    }
}

impl Engine {
    pub(super) fn entry_key(&mut self, key: KeyCode) -> CalcResult<Outcome> {
        let entry = self.entry.get_or_insert_with(NumberEntry::new);
        match key {
            KeyCode::Digit(d) => entry.push_digit(d),
            KeyCode::Point => entry.push_point(),
            KeyCode::Exponent => entry.start_exponent(),
            KeyCode::ChangeSign => entry.change_sign(),
            other => {
                return Err(CalcError::unsupported(format!(
                    "{:?} does not edit a number",
                    other
                )))
            }
        }
        Ok(Outcome::AwaitingInput)
    }

    pub(super) fn entry_backspace(&mut self) -> Outcome {
        let keep = self.entry.as_mut().is_some_and(NumberEntry::backspace);
        if keep {
            Outcome::AwaitingInput
        } else {
            self.entry = None;
            Outcome::StateChanged
        }
    }

    /// A unit key folds into the number being typed until it has one
    pub(super) fn entry_accepts_unit(&self) -> bool {
        self.entry.as_ref().is_some_and(|e| e.tag().is_untyped())
    }

    /// Push the finished number and record it as one value
    pub(super) fn finalize_entry(&mut self) -> CalcResult<()> {
        let Some(entry) = self.entry.take() else {
            return Ok(());
        };
        let value = entry.to_value()?;
        let point = self.rollback_point();
        self.push_value(value.clone())?;
        self.recorder.record(MacroOp::Value(value), point);
        Ok(())
    }

    pub(super) fn push_value(&mut self, value: TaggedValue) -> CalcResult<Outcome> {
        self.transact(move |_, state| {
            let mut next = state.clone();
            next.push(value);
            next.no_lift = false;
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &str) -> NumberEntry {
        let mut entry = NumberEntry::new();
        for c in keys.chars() {
            match c {
                '.' => entry.push_point(),
                'e' => entry.start_exponent(),
                '-' => entry.change_sign(),
                d => entry.push_digit(d.to_digit(10).unwrap() as u8),
            }
        }
        entry
    }

    #[test]
    fn mantissa_and_exponent() {
        assert_eq!(typed("12.5").value().unwrap(), 12.5);
        assert_eq!(typed("15e3").value().unwrap(), 15000.0);
        assert_eq!(typed("2e-3").value().unwrap(), 0.002);
        assert_eq!(typed("-4").value().unwrap(), -4.0);
        assert_eq!(typed("e2").value().unwrap(), 100.0);
        assert_eq!(typed(".").value().unwrap(), 0.0);
    }

    #[test]
    fn second_point_is_ignored() {
        assert_eq!(typed("1.2.3").to_string(), "1.23");
    }

    #[test]
    fn backspace_strips_unit_before_digits() {
        let mut entry = typed("7");
        entry.set_tag(TypeTag::new(1, 0));
        assert!(entry.backspace());
        assert!(entry.tag().is_untyped());
        assert!(!entry.backspace());
    }

    #[test]
    fn huge_exponent_is_out_of_range() {
        assert!(matches!(typed("1e999").value(), Err(CalcError::Domain(_))));
    }
}
