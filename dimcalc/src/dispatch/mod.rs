//! Operator dispatch
//!
//! Every operator key is resolved against three ordered tables:
//! 1. the plain table: untyped real scalar functions, tried first
//! 2. the pattern table: ordered `{pattern, predicate, transition}` entries;
//!    the first entry whose pattern matches the live registers is invoked and
//!    its result is final, even when the transition fails
//! 3. the conversion table, consulted for unit keys before the generic scalar
//!    conversion
//!
//! Transitions are pure: they receive the current state and return a new one.
//! The engine owns undo and decides what to do with a failure.

mod conversion;
mod pattern;
mod plain;
mod scalar;
mod stack;
mod structured;

pub use conversion::ConversionOp;
pub use pattern::{
    KindSet, PatternOp, Predicate, RegisterPattern, RegisterSpec, ShapeSet, Transition,
};
pub use plain::PlainOp;

use crate::algebra::{TypeRegistry, TypeTag};
use crate::keys::OpCode;
use crate::value::{CalcState, TaggedValue};
use crate::{CalcError, CalcResult};
use std::collections::HashMap;
use tracing::debug;

/// The operator registry: opcode to plain op, ordered pattern entries, and
/// structured conversions.
#[derive(Debug, Clone)]
pub struct DispatchTables {
    plain: HashMap<OpCode, PlainOp>,
    patterns: HashMap<OpCode, Vec<PatternOp>>,
    conversions: Vec<ConversionOp>,
}

impl Default for DispatchTables {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTables {
    /// Tables holding every builtin operator
    pub fn new() -> Self {
        let mut tables = Self::empty();
        for (op, plain) in plain::builtin() {
            tables.register_plain(op, plain);
        }
        scalar::register(&mut tables);
        structured::register(&mut tables);
        stack::register(&mut tables);
        tables.conversions = conversion::builtin();
        tables
    }

    pub fn empty() -> Self {
        Self {
            plain: HashMap::new(),
            patterns: HashMap::new(),
            conversions: Vec::new(),
        }
    }

    pub fn register_plain(&mut self, op: OpCode, plain: PlainOp) {
        self.plain.insert(op, plain);
    }

    /// Append an entry; earlier entries keep priority
    pub fn register_pattern(&mut self, op: OpCode, entry: PatternOp) {
        self.patterns.entry(op).or_default().push(entry);
    }

    pub fn register_conversion(&mut self, conversion: ConversionOp) {
        self.conversions.push(conversion);
    }

    pub fn patterns(&self, op: OpCode) -> &[PatternOp] {
        self.patterns.get(&op).map(Vec::as_slice).unwrap_or_default()
    }

    /// First pattern entry matching the state, if any
    pub fn select(&self, registry: &TypeRegistry, state: &CalcState, op: OpCode) -> Option<&PatternOp> {
        self.patterns(op)
            .iter()
            .find(|entry| entry.matches(registry, state))
    }

    /// True when some table can act on `op` at all
    pub fn knows(&self, op: OpCode) -> bool {
        self.plain.contains_key(&op) || self.patterns.contains_key(&op)
    }

    /// Apply an operator: plain table, then first matching pattern
    pub fn apply(&self, registry: &mut TypeRegistry, state: &CalcState, op: OpCode) -> CalcResult<CalcState> {
        if let Some(next) = self.plain.get(&op).and_then(|plain| plain.apply(state)) {
            debug!(%op, table = "plain", "applied operator");
            return Ok(next);
        }

        match self.select(registry, state, op) {
            Some(entry) => {
                debug!(%op, pattern = entry.name, "applied operator");
                (entry.transition)(registry, state)
            }
            None => Err(CalcError::type_mismatch(format!(
                "'{}' does not apply to {}",
                op,
                describe_operands(registry, state, op.arity())
            ))),
        }
    }

    /// Convert X into `target`: conversion table, then the generic scalar
    /// conversion
    pub fn convert(&self, registry: &TypeRegistry, state: &CalcState, target: TypeTag) -> CalcResult<CalcState> {
        let x = state.x();
        let conversion =
            registry
                .unit_convert(x.tag(), target)
                .ok_or_else(|| CalcError::UndefinedConversion {
                    from: describe(registry, x.tag()),
                    to: describe(registry, target),
                })?;

        let converted = match self.conversions.iter().find(|op| op.spec.matches(x)) {
            Some(op) => {
                debug!(conversion = op.name, to = %target, "converted");
                (op.convert)(x, &conversion)
            }
            None => match x.as_real() {
                Some(value) => TaggedValue::typed(conversion.apply(value), target),
                None => {
                    return Err(CalcError::type_mismatch(format!(
                        "cannot convert a {} value",
                        x.kind().name()
                    )))
                }
            },
        };

        Ok(unary_result(state, converted.with_tag(target)))
    }
}

// ----------------------------------------------------------------------
// Helpers shared by the transition modules
// ----------------------------------------------------------------------

/// Symbol of a tag for messages
pub(crate) fn describe(registry: &TypeRegistry, tag: TypeTag) -> String {
    if tag.is_untyped() {
        return "untyped".to_string();
    }
    registry
        .symbol(tag)
        .map(str::to_string)
        .unwrap_or_else(|| tag.to_string())
}

fn describe_operands(registry: &TypeRegistry, state: &CalcState, arity: usize) -> String {
    let parts: Vec<String> = state
        .registers()
        .iter()
        .take(arity.max(1))
        .rev()
        .map(|value| {
            let shape = if value.is_scalar() {
                String::new()
            } else {
                format!(" {}x{}", value.rows(), value.cols())
            };
            format!("{}{} [{}]", value.kind().name(), shape, describe(registry, value.tag()))
        })
        .collect();
    parts.join(", ")
}

/// Y and X of a matched binary pattern
pub(crate) fn operands(state: &CalcState) -> CalcResult<(&TaggedValue, &TaggedValue)> {
    let y = state
        .y()
        .ok_or_else(|| CalcError::shape("operator needs two registers"))?;
    Ok((y, state.x()))
}

/// X replaced by `value`
pub(crate) fn unary_result(state: &CalcState, mut value: TaggedValue) -> CalcState {
    let mut next = state.clone();
    value.set_format(state.x().format());
    next.last_x = state.x().clone();
    next.set_x(value);
    next.no_lift = false;
    next
}

/// X and Y replaced by `value`
pub(crate) fn binary_result(state: &CalcState, value: TaggedValue) -> CalcState {
    consume(state, 2, value)
}

/// The `count` lowest registers replaced by `value`
pub(crate) fn consume(state: &CalcState, count: usize, mut value: TaggedValue) -> CalcState {
    let mut next = state.clone();
    value.set_format(state.x().format());
    next.last_x = state.x().clone();
    for _ in 1..count {
        next.stack_drop();
    }
    next.set_x(value);
    next.no_lift = false;
    next
}

/// Tag and per-operand scale factors for `y ± x`.
///
/// `y` keeps its type when `x` can be scaled into it; otherwise an untyped
/// `y` adopts the type of `x`.
pub(crate) fn additive(registry: &TypeRegistry, y: TypeTag, x: TypeTag) -> CalcResult<(TypeTag, f64, f64)> {
    if let Some(ratio) = registry.type_addable(y, x) {
        return Ok((y, 1.0, ratio));
    }
    if let Some(ratio) = registry.type_addable(x, y) {
        return Ok((x, ratio, 1.0));
    }
    Err(CalcError::incompatible_units(format!(
        "cannot add {} and {}",
        describe(registry, y),
        describe(registry, x)
    )))
}

/// Tag and value ratio for `y · x` or `y / x`
pub(crate) fn multiplicative(
    registry: &mut TypeRegistry,
    y: TypeTag,
    x: TypeTag,
    quotient: bool,
) -> CalcResult<(TypeTag, f64)> {
    registry.type_product(y, x, quotient).ok_or_else(|| {
        CalcError::incompatible_units(format!(
            "no type for {} {} {}",
            describe(registry, y),
            if quotient { "/" } else { "·" },
            describe(registry, x)
        ))
    })
}

/// Real or rational scalar as a double
pub(crate) fn number(value: &TaggedValue) -> CalcResult<f64> {
    value.as_number().ok_or_else(|| {
        CalcError::type_mismatch(format!("expected a number, got {}", value.kind().name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn state(y: TaggedValue, x: TaggedValue) -> CalcState {
        let mut state = CalcState::new(4);
        state.set_register(1, y);
        state.set_register(0, x);
        state
    }

    #[test]
    fn plain_table_handles_untyped_reals() {
        let tables = DispatchTables::new();
        let mut registry = TypeRegistry::new();
        let next = tables
            .apply(
                &mut registry,
                &state(TaggedValue::real(5.0), TaggedValue::real(3.0)),
                OpCode::Add,
            )
            .unwrap();
        assert_eq!(next.x().as_real(), Some(8.0));
        assert!(next.x().tag().is_untyped());
    }

    #[test]
    fn typed_add_scales_x_into_y() {
        let tables = DispatchTables::new();
        let mut registry = TypeRegistry::new();
        let km = registry.lookup("km").unwrap();
        let m = registry.lookup("m").unwrap();
        let next = tables
            .apply(
                &mut registry,
                &state(TaggedValue::typed(1.0, km), TaggedValue::typed(500.0, m)),
                OpCode::Add,
            )
            .unwrap();
        assert_eq!(next.x().tag(), km);
        assert!((next.x().as_real().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn incompatible_add_is_reported() {
        let tables = DispatchTables::new();
        let mut registry = TypeRegistry::new();
        let m = registry.lookup("m").unwrap();
        let s = registry.lookup("s").unwrap();
        let err = tables
            .apply(
                &mut registry,
                &state(TaggedValue::typed(1.0, m), TaggedValue::typed(2.0, s)),
                OpCode::Add,
            )
            .unwrap_err();
        assert!(matches!(err, CalcError::IncompatibleUnits(_)));
    }

    #[test]
    fn unmatched_operands_are_a_type_mismatch() {
        let tables = DispatchTables::new();
        let mut registry = TypeRegistry::new();
        let v3 = TaggedValue::scalar(ValueKind::Vector3, &[1.0, 2.0, 3.0], TypeTag::UNTYPED);
        let err = tables
            .apply(&mut registry, &state(TaggedValue::real(1.0), v3), OpCode::Ln)
            .unwrap_err();
        assert!(matches!(err, CalcError::TypeMismatch(_)));
    }

    #[test]
    fn conversion_to_other_dimension_is_undefined() {
        let tables = DispatchTables::new();
        let registry = TypeRegistry::new();
        let m = registry.lookup("m").unwrap();
        let kg = registry.lookup("kg").unwrap();
        let err = tables
            .convert(
                &registry,
                &state(TaggedValue::real(0.0), TaggedValue::typed(1.0, m)),
                kg,
            )
            .unwrap_err();
        assert_eq!(
            err,
            CalcError::UndefinedConversion {
                from: "m".to_string(),
                to: "kg".to_string()
            }
        );
    }

    #[test]
    fn first_matching_pattern_wins_over_later_entries() {
        let mut tables = DispatchTables::empty();
        let any = RegisterPattern::x(RegisterSpec::new(KindSet::ANY, ShapeSet::ANY));
        tables.register_pattern(
            OpCode::Negate,
            PatternOp::new("never", any.clone(), |_, s| Ok(s.clone())).when(|_, _| false),
        );
        tables.register_pattern(
            OpCode::Negate,
            PatternOp::new("first", any.clone(), |_, _| Err(CalcError::domain("first"))),
        );
        tables.register_pattern(
            OpCode::Negate,
            PatternOp::new("second", any, |_, s| Ok(s.clone())),
        );
        let mut registry = TypeRegistry::new();
        let s = CalcState::new(4);
        assert_eq!(tables.select(&registry, &s, OpCode::Negate).unwrap().name, "first");
        // The failing first match is final
        assert_eq!(
            tables.apply(&mut registry, &s, OpCode::Negate),
            Err(CalcError::domain("first"))
        );
    }
}
