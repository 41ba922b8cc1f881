//! Products, quotients, powers and roots of types

use super::{DimensionId, TypeCode, TypeDef, TypeRegistry, TypeTag, UnitCode};

impl TypeRegistry {
    /// Type of `a · b` (or `a / b` when `quotient`), plus the value ratio the
    /// numeric result must be multiplied by.
    ///
    /// Factors of the same type combine their exponents and vanish at zero.
    /// Factors of the same unit at a different scale (cm against km) are
    /// folded into the factor already present, and the scale difference is
    /// accumulated into the returned ratio.
    ///
    /// # Examples
    /// ```text
    /// m  · s⁻¹  -> m/s,   1
    /// km · m    -> km^2,  0.001
    /// m  / km   -> (untyped), 0.001
    /// ```
    pub fn type_product(&mut self, a: TypeTag, b: TypeTag, quotient: bool) -> Option<(TypeTag, f64)> {
        let mut factors = self.type_code(a)?.factors().to_vec();
        let rhs = self.type_code(b)?.factors().to_vec();
        let sign = if quotient { -1 } else { 1 };

        let mut ratio = 1.0;
        for (tag, exp) in rhs {
            ratio *= self.merge_factor(&mut factors, tag, exp.checked_mul(sign)?)?;
        }

        let tag = self.resolve(factors)?;
        Some((tag, ratio))
    }

    /// Type of `y^n`: every factor's exponent multiplied by `n`. `None` when
    /// an exponent overflows.
    pub fn type_exponent(&mut self, y: TypeTag, n: i32) -> Option<TypeTag> {
        let factors = self
            .type_code(y)?
            .factors()
            .iter()
            .map(|(tag, exp)| Some((*tag, exp.checked_mul(n)?)))
            .collect::<Option<Vec<_>>>()?;
        self.resolve(factors)
    }

    /// Type of the `n`th root of `y`; fails unless every exponent divides by `n`
    pub fn type_nth_root(&mut self, y: TypeTag, n: i32) -> Option<TypeTag> {
        if n <= 0 {
            return None;
        }
        let mut factors = Vec::new();
        for (tag, exp) in self.type_code(y)?.factors() {
            if exp % n != 0 {
                return None;
            }
            factors.push((*tag, exp / n));
        }
        self.resolve(factors)
    }

    /// Multiply `tag^exp` into `factors`, returning the value ratio.
    ///
    /// A named derived type (kph, J) that shares a dimension with the other
    /// factors is first broken into base factors, so `m/s ÷ kph` cancels.
    fn merge_factor(&self, factors: &mut Vec<(TypeTag, i32)>, tag: TypeTag, exp: i32) -> Option<f64> {
        if factors.iter().any(|(t, _)| t.unit == tag.unit) {
            return self.fold_factor(factors, tag, exp);
        }
        if !factors.iter().any(|(t, _)| self.shares_dimension(*t, tag)) {
            factors.push((tag, exp));
            return Some(1.0);
        }

        let mut ratio = self.expand_overlapping(factors, tag)?;
        match self.base_factors(tag) {
            Some((parts, scale)) => {
                ratio *= scale.powi(exp);
                for (part, part_exp) in parts {
                    ratio *= self.merge_factor(factors, part, part_exp.checked_mul(exp)?)?;
                }
                Some(ratio)
            }
            None => Some(ratio * self.fold_factor(factors, tag, exp)?),
        }
    }

    /// Combine with a factor of the same type, or of the same unit at another
    /// scale, or append
    fn fold_factor(&self, factors: &mut Vec<(TypeTag, i32)>, tag: TypeTag, exp: i32) -> Option<f64> {
        if let Some(slot) = factors.iter_mut().find(|(t, _)| *t == tag) {
            slot.1 = slot.1.checked_add(exp)?;
            return Some(1.0);
        }

        if let Some(index) = factors.iter().position(|(t, _)| t.unit == tag.unit) {
            let kept = factors[index].0;
            let scale = self.type_def(tag)?.ratio / self.type_def(kept)?.ratio;
            factors[index].1 = factors[index].1.checked_add(exp)?;
            return Some(scale.powi(exp));
        }

        factors.push((tag, exp));
        Some(1.0)
    }

    /// Break every named derived factor sharing a dimension with `tag` into
    /// base factors
    fn expand_overlapping(&self, factors: &mut Vec<(TypeTag, i32)>, tag: TypeTag) -> Option<f64> {
        let mut ratio = 1.0;
        while let Some(index) = factors
            .iter()
            .position(|(t, _)| self.shares_dimension(*t, tag) && self.base_factors(*t).is_some())
        {
            let (present, present_exp) = factors.remove(index);
            let (parts, scale) = self.base_factors(present)?;
            ratio *= scale.powi(present_exp);
            for (part, part_exp) in parts {
                ratio *= self.merge_factor(factors, part, part_exp.checked_mul(present_exp)?)?;
            }
        }
        Some(ratio)
    }

    /// Base-dimension factors of a named derived type and the ratio of the
    /// type to their product: kph -> m·s⁻¹, 1/3.6.
    ///
    /// `None` for composites, for types of a single base dimension and when a
    /// base dimension has no type to stand for it.
    fn base_factors(&self, tag: TypeTag) -> Option<(Vec<(TypeTag, i32)>, f64)> {
        let def = self.type_def(tag)?;
        if !def.code.is_single(tag) || def.offset != 0.0 {
            return None;
        }
        let code = self.unit_code(tag)?;
        if code.is_dimensionless() || matches!(code.factors(), [(_, 1)]) {
            return None;
        }

        let mut ratio = def.ratio;
        let mut parts = Vec::with_capacity(code.factors().len());
        for (dimension, exp) in code.factors() {
            let base = self.base_type(*dimension)?;
            ratio /= self.type_def(base)?.ratio.powi(*exp);
            parts.push((base, *exp));
        }
        Some((parts, ratio))
    }

    /// The first type defined on the unit of a base dimension (m, kg, s)
    fn base_type(&self, dimension: DimensionId) -> Option<TypeTag> {
        let unit = *self.unit_index.get(&UnitCode::base(dimension))?;
        self.unit_def(unit)?.types().first().map(|def| def.tag)
    }

    fn shares_dimension(&self, a: TypeTag, b: TypeTag) -> bool {
        match (self.unit_code(a), self.unit_code(b)) {
            (Some(a), Some(b)) => a
                .factors()
                .iter()
                .any(|(d, _)| b.factors().iter().any(|(e, _)| d == e)),
            _ => false,
        }
    }

    /// Intern a factor list to its canonical tag, creating unit and type
    /// definitions on first encounter.
    fn resolve(&mut self, factors: Vec<(TypeTag, i32)>) -> Option<TypeTag> {
        let code = TypeCode::canonical(factors);
        match code.factors() {
            [] => return Some(TypeTag::UNTYPED),
            [(tag, 1)] => return Some(*tag),
            _ => {}
        }
        if let Some(tag) = self.composites.get(&code) {
            return Some(*tag);
        }

        let mut unit_code = UnitCode::dimensionless();
        let mut ratio = 1.0;
        for (tag, exp) in code.factors() {
            let def = self.type_def(*tag)?;
            ratio *= def.ratio.powi(*exp);
            unit_code = unit_code.combine(self.unit_code(*tag)?, *exp)?;
        }

        let symbol = self.composite_symbol(&code);
        let unit = self.intern_unit(unit_code);
        let ty = self.units.get(unit as usize)?.types().len() as u32;
        let tag = self.insert_type(TypeDef {
            tag: TypeTag::new(unit, ty),
            symbol: Some(symbol),
            ratio,
            offset: 0.0,
            code,
        })?;
        tracing::debug!(
            %tag,
            symbol = self.symbol(tag).unwrap_or_default(),
            "interned composite type"
        );
        Some(tag)
    }

    /// `kg·m^2/s^2`, `1/s`, `m/(s·kg)`
    fn composite_symbol(&self, code: &TypeCode) -> String {
        let part = |tag: TypeTag, exp: u32| {
            let symbol = self.symbol(tag).unwrap_or("?");
            if exp == 1 {
                symbol.to_string()
            } else {
                format!("{}^{}", symbol, exp)
            }
        };

        let numerator: Vec<String> = code
            .factors()
            .iter()
            .filter(|(_, exp)| *exp > 0)
            .map(|(tag, exp)| part(*tag, exp.unsigned_abs()))
            .collect();
        let denominator: Vec<String> = code
            .factors()
            .iter()
            .filter(|(_, exp)| *exp < 0)
            .map(|(tag, exp)| part(*tag, exp.unsigned_abs()))
            .collect();

        let mut symbol = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join("·")
        };
        match denominator.len() {
            0 => {}
            1 => {
                symbol.push('/');
                symbol.push_str(&denominator[0]);
            }
            _ => {
                symbol.push_str("/(");
                symbol.push_str(&denominator.join("·"));
                symbol.push(')');
            }
        }
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(registry: &TypeRegistry, symbol: &str) -> TypeTag {
        registry.lookup(symbol).unwrap()
    }

    #[test]
    fn quotient_builds_velocity() {
        let mut registry = TypeRegistry::new();
        let (velocity, ratio) = registry
            .type_product(tag(&registry, "m"), tag(&registry, "s"), true)
            .unwrap();
        assert_eq!(ratio, 1.0);
        insta::assert_snapshot!(registry.symbol(velocity).unwrap(), @"m/s");
        // Same dimension signature as the builtin velocity unit
        assert_eq!(velocity.unit, tag(&registry, "kph").unit);
    }

    #[test]
    fn product_interning_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let s = tag(&registry, "s");
        let first = registry.type_product(m, s, true).unwrap();
        let count = registry.type_count();
        let second = registry.type_product(m, s, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.type_count(), count);
    }

    #[test]
    fn same_dimension_factors_fold_with_ratio() {
        let mut registry = TypeRegistry::new();
        let km = tag(&registry, "km");
        let m = tag(&registry, "m");
        let (area, ratio) = registry.type_product(km, m, false).unwrap();
        assert!((ratio - 0.001).abs() < 1e-15);
        assert_eq!(registry.type_code(area).unwrap().factors(), &[(km, 2)]);
        insta::assert_snapshot!(registry.symbol(area).unwrap(), @"km^2");
    }

    #[test]
    fn cancelling_factors_become_untyped() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let km = tag(&registry, "km");
        let (result, ratio) = registry.type_product(m, km, true).unwrap();
        assert!(result.is_untyped());
        assert!((ratio - 0.001).abs() < 1e-15);
    }

    #[test]
    fn exponent_of_quotient_matches_quotient_of_exponents() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let s = tag(&registry, "s");
        let (velocity, _) = registry.type_product(m, s, true).unwrap();
        let squared = registry.type_exponent(velocity, 2).unwrap();

        let m2 = registry.type_exponent(m, 2).unwrap();
        let s2 = registry.type_exponent(s, 2).unwrap();
        let (direct, ratio) = registry.type_product(m2, s2, true).unwrap();
        assert_eq!(squared, direct);
        assert_eq!(ratio, 1.0);
        insta::assert_snapshot!(registry.symbol(direct).unwrap(), @"m^2/s^2");
    }

    #[test]
    fn nth_root_requires_divisible_exponents() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let m2 = registry.type_exponent(m, 2).unwrap();
        assert_eq!(registry.type_nth_root(m2, 2), Some(m));
        assert_eq!(registry.type_nth_root(m, 2), None);
        assert_eq!(registry.type_nth_root(TypeTag::UNTYPED, 3), Some(TypeTag::UNTYPED));
    }

    #[test]
    fn area_from_product_converts_to_hectares() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let (m2, _) = registry.type_product(m, m, false).unwrap();
        assert!(registry.is_dimension(m, DimensionId::LENGTH));
        let conversion = registry.unit_convert(m2, tag(&registry, "ha")).unwrap();
        assert!((conversion.apply(25_000.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn exponent_overflow_has_no_type() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let huge = registry.type_exponent(m, 2_000_000_000).unwrap();
        assert_eq!(registry.type_exponent(huge, 2), None);
        assert_eq!(registry.type_product(huge, huge, false), None);
    }

    #[test]
    fn named_velocity_cancels_against_composite_velocity() {
        let mut registry = TypeRegistry::new();
        let (velocity, _) = registry
            .type_product(tag(&registry, "m"), tag(&registry, "s"), true)
            .unwrap();
        let kph = tag(&registry, "kph");

        let (result, ratio) = registry.type_product(velocity, kph, true).unwrap();
        assert!(result.is_untyped());
        assert!((ratio - 3.6).abs() < 1e-12);

        let (result, ratio) = registry.type_product(kph, velocity, true).unwrap();
        assert!(result.is_untyped());
        assert!((ratio - 1.0 / 3.6).abs() < 1e-12);
    }

    #[test]
    fn named_velocity_times_time_is_length() {
        let mut registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let (result, ratio) = registry
            .type_product(tag(&registry, "kph"), tag(&registry, "h"), false)
            .unwrap();
        assert_eq!(result, m);
        assert!((ratio - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_named_types_keep_their_names() {
        let mut registry = TypeRegistry::new();
        let (result, ratio) = registry
            .type_product(tag(&registry, "kph"), tag(&registry, "kg"), false)
            .unwrap();
        assert_eq!(ratio, 1.0);
        insta::assert_snapshot!(registry.symbol(result).unwrap(), @"kg·kph");
    }

    #[test]
    fn registry_limit_refuses_new_composites() {
        let mut registry = TypeRegistry::with_max_types(super::super::builtin::TYPES.len() + 1);
        let m = tag(&registry, "m");
        let s = tag(&registry, "s");
        assert!(registry.type_product(m, s, true).is_none());
        // Existing and trivially resolved results still work
        assert_eq!(registry.type_product(m, TypeTag::UNTYPED, false), Some((m, 1.0)));
    }
}
