//! Dimensional type/unit algebra
//!
//! The [`TypeRegistry`] owns every dimension, unit and type definition of a
//! calculator instance and performs the runtime type inference used by
//! arithmetic:
//! - unit conversion between types of the same unit
//! - addability of two tagged values (with the ratio scaling one into the other)
//! - products, quotients, integer powers and roots of types
//!
//! Composite types (`m/s`, `kg·m^2`) are interned on first use and are
//! permanent afterwards. All inference operations return `None` when they do
//! not apply; callers decide which error that is.

mod builtin;
mod codes;
mod product;

pub use codes::{DimensionId, TypeCode, TypeTag, UnitCode};

use crate::{CalcError, CalcResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Composed scale/offset operator converting a value between two types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub scale: f64,
    pub offset: f64,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion {
        scale: 1.0,
        offset: 0.0,
    };

    /// Convert an absolute value (applies the offset)
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Convert a magnitude or difference (scale only)
    pub fn scale_only(&self, value: f64) -> f64 {
        value * self.scale
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// A unit: a named or anonymous dimension signature and the types scaled on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: u32,
    pub symbol: Option<String>,
    pub code: UnitCode,
    #[serde(skip)]
    types: Vec<TypeDef>,
}

impl UnitDef {
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }
}

/// A concrete type: ratio/offset to its unit's base scale and its factorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub tag: TypeTag,
    pub symbol: Option<String>,
    pub ratio: f64,
    pub offset: f64,
    pub code: TypeCode,
}

impl TypeDef {
    pub fn is_composite(&self) -> bool {
        !self.code.is_single(self.tag)
    }
}

/// Definitions created after the builtins, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub dimensions: Vec<String>,
    pub units: Vec<UnitDef>,
    pub types: Vec<TypeDef>,
}

/// Owned interning registry for dimensions, units and types
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    dimensions: Vec<String>,
    units: Vec<UnitDef>,
    unit_index: HashMap<UnitCode, u32>,
    composites: HashMap<TypeCode, TypeTag>,
    symbols: HashMap<String, TypeTag>,
    type_count: usize,
    max_types: usize,
    builtin_dimensions: usize,
    created_units: Vec<u32>,
    created_types: Vec<TypeTag>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::with_max_types(crate::ResourceLimits::default().max_interned_types)
    }

    pub fn with_limits(limits: &crate::ResourceLimits) -> Self {
        Self::with_max_types(limits.max_interned_types)
    }

    /// Registry holding at most `max_types` type definitions, builtins included
    pub fn with_max_types(max_types: usize) -> Self {
        let mut registry = Self::empty(max_types);
        registry.install_builtins();
        registry
    }

    fn empty(max_types: usize) -> Self {
        let untyped = TypeDef {
            tag: TypeTag::UNTYPED,
            symbol: None,
            ratio: 1.0,
            offset: 0.0,
            code: TypeCode::empty(),
        };
        let dimensionless = UnitDef {
            id: 0,
            symbol: None,
            code: UnitCode::dimensionless(),
            types: vec![untyped],
        };
        let mut unit_index = HashMap::new();
        unit_index.insert(UnitCode::dimensionless(), 0);
        Self {
            dimensions: Vec::new(),
            units: vec![dimensionless],
            unit_index,
            composites: HashMap::new(),
            symbols: HashMap::new(),
            type_count: 1,
            max_types,
            builtin_dimensions: 0,
            created_units: Vec::new(),
            created_types: Vec::new(),
        }
    }

    fn install_builtins(&mut self) {
        self.dimensions = builtin::DIMENSIONS.iter().map(|d| d.to_string()).collect();
        self.builtin_dimensions = self.dimensions.len();

        for (symbol, factors) in builtin::UNITS {
            let id = self.intern_unit(UnitCode::from_factors(factors.iter().copied()));
            self.units[id as usize].symbol = Some(symbol.to_string());
        }

        for def in builtin::TYPES {
            let Some(unit) = self.unit_by_symbol(def.unit) else {
                continue;
            };
            if let Some(tag) = self.insert_named(unit, def.symbol, def.ratio, def.offset) {
                for alias in def.aliases {
                    self.symbols.insert(alias.to_string(), tag);
                }
            }
        }

        self.created_units.clear();
        self.created_types.clear();
    }

    /// Drop every runtime-created definition and return to the builtin set
    pub fn reset(&mut self) {
        *self = Self::with_max_types(self.max_types);
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn lookup(&self, symbol: &str) -> Option<TypeTag> {
        self.symbols.get(symbol).copied()
    }

    pub fn type_def(&self, tag: TypeTag) -> Option<&TypeDef> {
        self.units
            .get(tag.unit as usize)
            .and_then(|unit| unit.types.get(tag.ty as usize))
    }

    pub fn unit_def(&self, unit: u32) -> Option<&UnitDef> {
        self.units.get(unit as usize)
    }

    pub fn unit_by_symbol(&self, symbol: &str) -> Option<u32> {
        self.units
            .iter()
            .find(|unit| unit.symbol.as_deref() == Some(symbol))
            .map(|unit| unit.id)
    }

    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Display symbol of a type; untyped values have none
    pub fn symbol(&self, tag: TypeTag) -> Option<&str> {
        self.type_def(tag).and_then(|def| def.symbol.as_deref())
    }

    pub fn type_code(&self, tag: TypeTag) -> Option<&TypeCode> {
        self.type_def(tag).map(|def| &def.code)
    }

    pub fn unit_code(&self, tag: TypeTag) -> Option<&UnitCode> {
        self.unit_def(tag.unit).map(|unit| &unit.code)
    }

    pub fn type_count(&self) -> usize {
        self.type_count
    }

    /// True when the tag's unit is the given base dimension to the first power
    pub fn is_dimension(&self, tag: TypeTag, dimension: DimensionId) -> bool {
        self.unit_code(tag)
            .is_some_and(|code| code == &UnitCode::base(dimension))
    }

    // ------------------------------------------------------------------
    // Inference
    // ------------------------------------------------------------------

    /// Scale/offset operator converting `from` into `to`.
    ///
    /// Applies when both share a unit, or when `from` is untyped (tagging an
    /// untyped value is the identity). Converting a typed value to untyped
    /// never applies.
    pub fn unit_convert(&self, from: TypeTag, to: TypeTag) -> Option<Conversion> {
        let target = self.type_def(to)?;
        if from == to || from.is_untyped() {
            return Some(Conversion::IDENTITY);
        }
        if to.is_untyped() || from.unit != to.unit {
            return None;
        }
        let source = self.type_def(from)?;
        Some(Conversion {
            scale: source.ratio / target.ratio,
            offset: (source.offset - target.offset) / target.ratio,
        })
    }

    /// Ratio that scales a value of type `b` into type `a` so the two can be added.
    ///
    /// Asymmetric: an untyped `b` is adopted by a typed `a`, but a typed `b`
    /// is never absorbed into an untyped `a`. Offsets are ignored; the ratio
    /// describes differences, not absolute temperatures.
    pub fn type_addable(&self, a: TypeTag, b: TypeTag) -> Option<f64> {
        if a == b || b.is_untyped() {
            return Some(1.0);
        }
        if a.is_untyped() || a.unit != b.unit {
            return None;
        }
        Some(self.type_def(b)?.ratio / self.type_def(a)?.ratio)
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// Define a new base dimension together with its unit
    pub fn define_dimension(&mut self, name: &str) -> DimensionId {
        if let Some(index) = self.dimensions.iter().position(|d| d == name) {
            return DimensionId(index as u16);
        }
        let id = DimensionId(self.dimensions.len() as u16);
        self.dimensions.push(name.to_string());
        let unit = self.intern_unit(UnitCode::base(id));
        if self.units[unit as usize].symbol.is_none() {
            self.units[unit as usize].symbol = Some(name.to_string());
        }
        debug!(dimension = name, id = id.0, "defined dimension");
        id
    }

    /// Name a unit-code, creating the unit if it does not exist yet
    pub fn define_unit(&mut self, symbol: &str, code: UnitCode) -> u32 {
        let id = self.intern_unit(code);
        if self.units[id as usize].symbol.is_none() {
            self.units[id as usize].symbol = Some(symbol.to_string());
        }
        id
    }

    /// Define a named type on an existing unit; symbols are unique
    pub fn define_type(
        &mut self,
        symbol: &str,
        unit: u32,
        ratio: f64,
        offset: f64,
    ) -> CalcResult<TypeTag> {
        if self.symbols.contains_key(symbol) {
            return Err(CalcError::unsupported(format!(
                "type symbol '{}' is already defined",
                symbol
            )));
        }
        if !ratio.is_finite() || ratio == 0.0 || !offset.is_finite() {
            return Err(CalcError::domain(format!(
                "invalid ratio/offset for type '{}'",
                symbol
            )));
        }
        if self.unit_def(unit).is_none() || unit == 0 {
            return Err(CalcError::UnknownSymbol(format!("unit {}", unit)));
        }
        self.insert_named(unit, symbol, ratio, offset)
            .ok_or_else(|| CalcError::limit("max_interned_types", self.max_types))
    }

    /// Define a named type as a multiple of an existing one (`1 fur = 201.168 m`)
    pub fn define_scaled(&mut self, symbol: &str, of: TypeTag, factor: f64) -> CalcResult<TypeTag> {
        let base = self
            .type_def(of)
            .ok_or_else(|| CalcError::UnknownSymbol(of.to_string()))?;
        let ratio = base.ratio * factor;
        self.define_type(symbol, of.unit, ratio, 0.0)
    }

    fn intern_unit(&mut self, code: UnitCode) -> u32 {
        if let Some(id) = self.unit_index.get(&code) {
            return *id;
        }
        let id = self.units.len() as u32;
        self.units.push(UnitDef {
            id,
            symbol: None,
            code: code.clone(),
            types: Vec::new(),
        });
        self.unit_index.insert(code, id);
        self.created_units.push(id);
        id
    }

    fn insert_named(&mut self, unit: u32, symbol: &str, ratio: f64, offset: f64) -> Option<TypeTag> {
        let ty = self.units.get(unit as usize)?.types.len() as u32;
        let tag = TypeTag::new(unit, ty);
        self.insert_type(TypeDef {
            tag,
            symbol: Some(symbol.to_string()),
            ratio,
            offset,
            code: TypeCode::single(tag),
        })
    }

    fn insert_type(&mut self, def: TypeDef) -> Option<TypeTag> {
        if self.type_count >= self.max_types {
            warn!(
                limit = self.max_types,
                "type registry is full, refusing to intern a new type"
            );
            return None;
        }
        let unit = self.units.get_mut(def.tag.unit as usize)?;
        if def.tag.ty as usize != unit.types.len() {
            return None;
        }
        let tag = def.tag;
        if let Some(symbol) = &def.symbol {
            self.symbols.entry(symbol.clone()).or_insert(tag);
        }
        if def.is_composite() {
            self.composites.insert(def.code.clone(), tag);
        }
        unit.types.push(def);
        self.type_count += 1;
        self.created_types.push(tag);
        Some(tag)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Every definition created after the builtins
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            dimensions: self.dimensions[self.builtin_dimensions..].to_vec(),
            units: self
                .created_units
                .iter()
                .filter_map(|id| self.unit_def(*id).cloned())
                .collect(),
            types: self
                .created_types
                .iter()
                .filter_map(|tag| self.type_def(*tag).cloned())
                .collect(),
        }
    }

    /// Reset to the builtins and replay a snapshot.
    ///
    /// Ids are positional, so the replay must reproduce every recorded tag
    /// exactly; otherwise the registry is left untouched.
    pub fn restore(&mut self, snapshot: &RegistrySnapshot) -> CalcResult<()> {
        let mut fresh = Self::with_max_types(self.max_types);
        fresh.dimensions.extend(snapshot.dimensions.iter().cloned());

        for unit in &snapshot.units {
            let id = fresh.intern_unit(unit.code.clone());
            if id != unit.id {
                return Err(CalcError::Serialization(format!(
                    "unit {} restored as {}",
                    unit.id, id
                )));
            }
            fresh.units[id as usize].symbol = unit.symbol.clone();
        }

        for def in &snapshot.types {
            let restored = fresh.insert_type(def.clone());
            if restored != Some(def.tag) {
                return Err(CalcError::Serialization(format!(
                    "type {} could not be restored",
                    def.tag
                )));
            }
        }

        *self = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(registry: &TypeRegistry, symbol: &str) -> TypeTag {
        registry.lookup(symbol).unwrap()
    }

    #[test]
    fn builtin_symbols_resolve() {
        let registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let km = tag(&registry, "km");
        assert_eq!(m.unit, km.unit);
        assert_ne!(m.ty, km.ty);
        assert_eq!(registry.lookup("um"), registry.lookup("µm"));
        assert!(registry.lookup("furlong").is_none());
    }

    #[test]
    fn convert_length() {
        let registry = TypeRegistry::new();
        let conversion = registry
            .unit_convert(tag(&registry, "km"), tag(&registry, "mi"))
            .unwrap();
        assert!((conversion.apply(5.0) - 3.106855961).abs() < 1e-6);
    }

    #[test]
    fn convert_temperature_uses_offsets() {
        let registry = TypeRegistry::new();
        let c_to_f = registry
            .unit_convert(tag(&registry, "°C"), tag(&registry, "°F"))
            .unwrap();
        assert!((c_to_f.apply(100.0) - 212.0).abs() < 1e-9);
        assert!((c_to_f.apply(-40.0) + 40.0).abs() < 1e-9);
        let k_to_c = registry
            .unit_convert(tag(&registry, "K"), tag(&registry, "degC"))
            .unwrap();
        assert!((k_to_c.apply(0.0) + 273.15).abs() < 1e-9);
    }

    #[test]
    fn convert_rejects_other_dimensions_and_untyping() {
        let registry = TypeRegistry::new();
        assert!(registry
            .unit_convert(tag(&registry, "m"), tag(&registry, "s"))
            .is_none());
        assert!(registry
            .unit_convert(tag(&registry, "m"), TypeTag::UNTYPED)
            .is_none());
        assert_eq!(
            registry.unit_convert(TypeTag::UNTYPED, tag(&registry, "s")),
            Some(Conversion::IDENTITY)
        );
    }

    #[test]
    fn addable_is_asymmetric() {
        let registry = TypeRegistry::new();
        let m = tag(&registry, "m");
        let km = tag(&registry, "km");
        assert_eq!(registry.type_addable(m, TypeTag::UNTYPED), Some(1.0));
        assert_eq!(registry.type_addable(TypeTag::UNTYPED, m), None);
        assert_eq!(registry.type_addable(m, km), Some(1000.0));
        assert_eq!(registry.type_addable(km, m), Some(0.001));
        assert_eq!(registry.type_addable(m, tag(&registry, "kg")), None);
    }

    #[test]
    fn define_dimension_and_type() {
        let mut registry = TypeRegistry::new();
        let items = registry.define_dimension("items");
        let unit = registry.unit_by_symbol("items").unwrap();
        assert_eq!(registry.dimensions()[items.0 as usize], "items");
        let each = registry.define_type("ea", unit, 1.0, 0.0).unwrap();
        let dozen = registry.define_type("doz", unit, 12.0, 0.0).unwrap();
        assert_eq!(registry.type_addable(each, dozen), Some(12.0));
        assert!(registry.define_type("doz", unit, 12.0, 0.0).is_err());
    }

    #[test]
    fn snapshot_restore_reproduces_tags() {
        let mut registry = TypeRegistry::new();
        let fur = registry
            .define_scaled("fur", tag(&registry, "m"), 201.168)
            .unwrap();
        let (speed, _) = registry
            .type_product(fur, tag(&registry, "wk"), true)
            .unwrap();
        let snapshot = registry.snapshot();

        let mut restored = TypeRegistry::new();
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.lookup("fur"), Some(fur));
        assert_eq!(restored.type_def(speed), registry.type_def(speed));
        assert_eq!(restored.type_count(), registry.type_count());
    }

    #[test]
    fn reset_drops_created_types() {
        let mut registry = TypeRegistry::new();
        let builtin_count = registry.type_count();
        registry
            .type_product(tag(&registry, "m"), tag(&registry, "s"), true)
            .unwrap();
        assert!(registry.type_count() > builtin_count);
        registry.reset();
        assert_eq!(registry.type_count(), builtin_count);
        assert!(registry.snapshot().types.is_empty());
    }
}
