//! Unit-codes, type-codes and the tags they intern to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a base dimension (length, time, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionId(pub u16);

impl DimensionId {
    pub const LENGTH: Self = Self(0);
    pub const MASS: Self = Self(1);
    pub const TIME: Self = Self(2);
    pub const CURRENT: Self = Self(3);
    pub const TEMPERATURE: Self = Self(4);
    pub const AMOUNT: Self = Self(5);
    pub const LUMINOSITY: Self = Self(6);
    pub const ANGLE: Self = Self(7);
    pub const DATA: Self = Self(8);
}

/// Identifies a physical unit: `unit` picks the dimension signature, `ty` the
/// concrete scale within it (m vs km).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag {
    pub unit: u32,
    pub ty: u32,
}

impl TypeTag {
    /// Dimension-polymorphic identity
    pub const UNTYPED: TypeTag = TypeTag { unit: 0, ty: 0 };

    pub const fn new(unit: u32, ty: u32) -> Self {
        Self { unit, ty }
    }

    pub fn is_untyped(&self) -> bool {
        *self == Self::UNTYPED
    }
}

impl Default for TypeTag {
    fn default() -> Self {
        Self::UNTYPED
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.unit, self.ty)
    }
}

/// Decomposition of a unit into exponentiated base dimensions.
///
/// Always normalized: sorted by dimension, no zero exponents. Two codes are
/// equal exactly when they describe the same dimension signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitCode(Vec<(DimensionId, i32)>);

impl UnitCode {
    pub fn dimensionless() -> Self {
        Self(Vec::new())
    }

    pub fn base(dimension: DimensionId) -> Self {
        Self(vec![(dimension, 1)])
    }

    pub fn from_factors(factors: impl IntoIterator<Item = (DimensionId, i32)>) -> Self {
        let mut merged: Vec<(DimensionId, i32)> = Vec::new();
        for (dim, exp) in factors {
            match merged.iter_mut().find(|(d, _)| *d == dim) {
                Some(slot) => slot.1 += exp,
                None => merged.push((dim, exp)),
            }
        }
        merged.retain(|(_, exp)| *exp != 0);
        merged.sort_by_key(|(dim, _)| *dim);
        Self(merged)
    }

    pub fn factors(&self) -> &[(DimensionId, i32)] {
        &self.0
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    /// `self · other^exponent`; `None` when an exponent overflows
    pub fn combine(&self, other: &UnitCode, exponent: i32) -> Option<UnitCode> {
        let mut merged = self.0.clone();
        for (dim, exp) in &other.0 {
            let exp = exp.checked_mul(exponent)?;
            match merged.iter_mut().find(|(d, _)| d == dim) {
                Some(slot) => slot.1 = slot.1.checked_add(exp)?,
                None => merged.push((*dim, exp)),
            }
        }
        Some(UnitCode::from_factors(merged))
    }
}

/// Decomposition of a composite type into exponentiated concrete factor tags.
///
/// Unlike [`UnitCode`] this keeps scale identity: `km·h⁻¹` and `m·s⁻¹` have
/// the same unit-code but different type-codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TypeCode(Vec<(TypeTag, i32)>);

impl TypeCode {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Type-code of a named type: the type itself to the first power
    pub fn single(tag: TypeTag) -> Self {
        Self(vec![(tag, 1)])
    }

    /// Canonical form: zero exponents dropped, positive exponents first, then
    /// negative ones, each group ordered by tag.
    pub fn canonical(mut factors: Vec<(TypeTag, i32)>) -> Self {
        factors.retain(|(_, exp)| *exp != 0);
        factors.sort_by_key(|(tag, exp)| (*exp < 0, *tag));
        Self(factors)
    }

    pub fn factors(&self) -> &[(TypeTag, i32)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the type-code of a named (non-composite) type
    pub fn is_single(&self, tag: TypeTag) -> bool {
        matches!(self.0.as_slice(), [(t, 1)] if *t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_code_merges_and_drops_zero_exponents() {
        let code = UnitCode::from_factors([
            (DimensionId::TIME, -1),
            (DimensionId::LENGTH, 1),
            (DimensionId::TIME, 1),
        ]);
        assert_eq!(code, UnitCode::base(DimensionId::LENGTH));
    }

    #[test]
    fn unit_code_combine_with_negative_exponent() {
        let velocity = UnitCode::base(DimensionId::LENGTH)
            .combine(&UnitCode::base(DimensionId::TIME), -1)
            .unwrap();
        assert_eq!(
            velocity.factors(),
            &[(DimensionId::LENGTH, 1), (DimensionId::TIME, -1)]
        );
    }

    #[test]
    fn unit_code_combine_overflow_is_refused() {
        let length = UnitCode::base(DimensionId::LENGTH);
        let huge = length.combine(&length, i32::MAX - 1).unwrap();
        assert_eq!(huge.factors(), &[(DimensionId::LENGTH, i32::MAX)]);
        assert_eq!(huge.combine(&length, 1), None);
        assert_eq!(length.combine(&length.combine(&length, 1).unwrap(), i32::MAX), None);
    }

    #[test]
    fn type_code_canonical_groups_signs() {
        let a = TypeTag::new(3, 0);
        let b = TypeTag::new(1, 0);
        let c = TypeTag::new(2, 1);
        let code = TypeCode::canonical(vec![(a, -2), (b, 0), (c, 1), (TypeTag::new(1, 4), 3)]);
        assert_eq!(
            code.factors(),
            &[(TypeTag::new(1, 4), 3), (c, 1), (a, -2)]
        );
    }
}
