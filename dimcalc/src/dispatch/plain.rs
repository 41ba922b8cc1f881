//! Plain operator table: untyped real scalar functions

use super::{binary_result, unary_result};
use crate::keys::OpCode;
use crate::value::{CalcState, FormatRecord, FormatStyle, TaggedValue};

/// Unconditional transform on untyped real scalars.
///
/// Applying yields `None` when the operands are not untyped real scalars or
/// the result is not finite; the pattern table then gets its turn.
#[derive(Debug, Clone, Copy)]
pub enum PlainOp {
    Unary(fn(f64) -> f64),
    /// `f(y, x)`
    Binary(fn(f64, f64) -> f64),
    Constant(f64),
    /// Unary conversion that also fixes the display style of the result
    Fixed(fn(f64) -> f64, FormatStyle),
}

fn untyped_real(value: Option<&TaggedValue>) -> Option<f64> {
    value
        .filter(|v| v.tag().is_untyped())
        .and_then(TaggedValue::as_real)
}

impl PlainOp {
    pub fn apply(&self, state: &CalcState) -> Option<CalcState> {
        let finite = |r: f64| Some(r).filter(|r| r.is_finite());
        match self {
            PlainOp::Unary(f) => {
                let x = untyped_real(Some(state.x()))?;
                let result = finite(f(x))?;
                Some(unary_result(state, TaggedValue::real(result)))
            }
            PlainOp::Binary(f) => {
                let x = untyped_real(Some(state.x()))?;
                let y = untyped_real(state.y())?;
                let result = finite(f(y, x))?;
                Some(binary_result(state, TaggedValue::real(result)))
            }
            PlainOp::Constant(c) => {
                let mut next = state.clone();
                next.push(TaggedValue::real(*c));
                Some(next)
            }
            PlainOp::Fixed(f, style) => {
                let x = untyped_real(Some(state.x()))?;
                let result = finite(f(x))?;
                let mut next = unary_result(state, TaggedValue::real(result));
                next.x_mut().set_format(FormatRecord {
                    style: *style,
                    ..state.x().format()
                });
                Some(next)
            }
        }
    }
}

pub(crate) fn builtin() -> Vec<(OpCode, PlainOp)> {
    use PlainOp::*;
    vec![
        (OpCode::Add, Binary(|y, x| y + x)),
        (OpCode::Subtract, Binary(|y, x| y - x)),
        (OpCode::Multiply, Binary(|y, x| y * x)),
        (OpCode::Divide, Binary(|y, x| y / x)),
        (OpCode::Power, Binary(f64::powf)),
        (OpCode::NthRoot, Binary(|y, x| y.powf(1.0 / x))),
        (OpCode::Sqrt, Unary(f64::sqrt)),
        (OpCode::Square, Unary(|x| x * x)),
        (OpCode::Reciprocal, Unary(|x| 1.0 / x)),
        (OpCode::Negate, Unary(|x| -x)),
        (OpCode::Abs, Unary(f64::abs)),
        (OpCode::Sin, Unary(f64::sin)),
        (OpCode::Cos, Unary(f64::cos)),
        (OpCode::Tan, Unary(f64::tan)),
        (OpCode::Asin, Unary(f64::asin)),
        (OpCode::Acos, Unary(f64::acos)),
        (OpCode::Atan, Unary(f64::atan)),
        (OpCode::Ln, Unary(f64::ln)),
        (OpCode::Exp, Unary(f64::exp)),
        (OpCode::Log10, Unary(f64::log10)),
        (OpCode::Pow10, Unary(|x| 10f64.powf(x))),
        (OpCode::Pi, Constant(std::f64::consts::PI)),
        (OpCode::E, Constant(std::f64::consts::E)),
        (
            OpCode::ToRadians,
            Fixed(f64::to_radians, FormatStyle::Decimal),
        ),
        (
            OpCode::ToDegrees,
            Fixed(f64::to_degrees, FormatStyle::Decimal),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::TypeTag;

    fn state(y: f64, x: f64) -> CalcState {
        let mut state = CalcState::new(4);
        state.set_register(1, TaggedValue::real(y));
        state.set_register(0, TaggedValue::real(x));
        state
    }

    #[test]
    fn binary_consumes_y_and_x() {
        let next = PlainOp::Binary(|y, x| y - x).apply(&state(5.0, 3.0)).unwrap();
        assert_eq!(next.x().as_real(), Some(2.0));
        assert_eq!(next.last_x.as_real(), Some(3.0));
    }

    #[test]
    fn typed_operand_is_not_applicable() {
        let mut s = state(5.0, 3.0);
        s.set_x(TaggedValue::typed(3.0, TypeTag::new(1, 0)));
        assert!(PlainOp::Unary(f64::sqrt).apply(&s).is_none());
    }

    #[test]
    fn non_finite_result_is_not_applicable() {
        assert!(PlainOp::Unary(f64::sqrt).apply(&state(0.0, -4.0)).is_none());
        assert!(PlainOp::Binary(|y, x| y / x).apply(&state(1.0, 0.0)).is_none());
    }
}
