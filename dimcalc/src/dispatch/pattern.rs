//! Declarative register patterns

use crate::algebra::TypeRegistry;
use crate::value::{CalcState, Shape, TaggedValue, ValueKind};
use crate::CalcResult;
use std::fmt;
use std::ops::BitOr;

/// Set of acceptable value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSet(u8);

impl KindSet {
    pub const REAL: KindSet = KindSet(1 << 0);
    pub const RATIONAL: KindSet = KindSet(1 << 1);
    pub const COMPLEX: KindSet = KindSet(1 << 2);
    pub const VECTOR2: KindSet = KindSet(1 << 3);
    pub const POLAR: KindSet = KindSet(1 << 4);
    pub const VECTOR3: KindSet = KindSet(1 << 5);
    pub const SPHERICAL: KindSet = KindSet(1 << 6);

    pub const NUMBER: KindSet = KindSet(Self::REAL.0 | Self::RATIONAL.0);
    pub const PLANAR: KindSet = KindSet(Self::VECTOR2.0 | Self::POLAR.0);
    pub const SPATIAL: KindSet = KindSet(Self::VECTOR3.0 | Self::SPHERICAL.0);
    pub const VECTOR: KindSet = KindSet(Self::PLANAR.0 | Self::SPATIAL.0);
    pub const ANY: KindSet = KindSet(0x7f);

    pub const fn with(self, other: KindSet) -> KindSet {
        KindSet(self.0 | other.0)
    }

    pub fn of(kind: ValueKind) -> KindSet {
        match kind {
            ValueKind::Real => Self::REAL,
            ValueKind::Rational => Self::RATIONAL,
            ValueKind::Complex => Self::COMPLEX,
            ValueKind::Vector2 => Self::VECTOR2,
            ValueKind::Polar => Self::POLAR,
            ValueKind::Vector3 => Self::VECTOR3,
            ValueKind::Spherical => Self::SPHERICAL,
        }
    }

    pub fn contains(self, kind: ValueKind) -> bool {
        self.0 & Self::of(kind).0 != 0
    }
}

impl BitOr for KindSet {
    type Output = KindSet;

    fn bitor(self, rhs: KindSet) -> KindSet {
        KindSet(self.0 | rhs.0)
    }
}

/// Set of acceptable shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeSet(u8);

impl ShapeSet {
    pub const SCALAR: ShapeSet = ShapeSet(1 << 0);
    pub const ROW: ShapeSet = ShapeSet(1 << 1);
    pub const COLUMN: ShapeSet = ShapeSet(1 << 2);
    pub const MATRIX: ShapeSet = ShapeSet(1 << 3);

    pub const LINEAR: ShapeSet = ShapeSet(Self::ROW.0 | Self::COLUMN.0);
    pub const ARRAY: ShapeSet = ShapeSet(Self::LINEAR.0 | Self::MATRIX.0);
    pub const ANY: ShapeSet = ShapeSet(0x0f);

    pub const fn with(self, other: ShapeSet) -> ShapeSet {
        ShapeSet(self.0 | other.0)
    }

    pub fn of(shape: Shape) -> ShapeSet {
        match shape {
            Shape::Scalar => Self::SCALAR,
            Shape::Row => Self::ROW,
            Shape::Column => Self::COLUMN,
            Shape::Matrix => Self::MATRIX,
        }
    }

    pub fn contains(self, shape: Shape) -> bool {
        self.0 & Self::of(shape).0 != 0
    }
}

impl BitOr for ShapeSet {
    type Output = ShapeSet;

    fn bitor(self, rhs: ShapeSet) -> ShapeSet {
        ShapeSet(self.0 | rhs.0)
    }
}

/// Requirement on a single register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub kinds: KindSet,
    pub shapes: ShapeSet,
}

impl RegisterSpec {
    pub const fn new(kinds: KindSet, shapes: ShapeSet) -> Self {
        Self { kinds, shapes }
    }

    pub const fn scalar(kinds: KindSet) -> Self {
        Self::new(kinds, ShapeSet::SCALAR)
    }

    pub fn matches(&self, value: &TaggedValue) -> bool {
        self.kinds.contains(value.kind()) && self.shapes.contains(value.shape())
    }
}

/// Per-register specs, X first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterPattern(pub Vec<RegisterSpec>);

impl RegisterPattern {
    /// Pattern that matches any stack
    pub fn any() -> Self {
        Self(Vec::new())
    }

    pub fn x(x: RegisterSpec) -> Self {
        Self(vec![x])
    }

    pub fn xy(x: RegisterSpec, y: RegisterSpec) -> Self {
        Self(vec![x, y])
    }

    pub fn xyz(x: RegisterSpec, y: RegisterSpec, z: RegisterSpec) -> Self {
        Self(vec![x, y, z])
    }

    pub fn matches(&self, state: &CalcState) -> bool {
        self.0.iter().enumerate().all(|(i, spec)| {
            state
                .register(i)
                .is_some_and(|value| spec.matches(value))
        })
    }
}

pub type Predicate = fn(&TypeRegistry, &CalcState) -> bool;
pub type Transition = fn(&mut TypeRegistry, &CalcState) -> CalcResult<CalcState>;

/// One entry of the pattern table
#[derive(Clone)]
pub struct PatternOp {
    pub name: &'static str,
    pub pattern: RegisterPattern,
    pub predicate: Option<Predicate>,
    pub transition: Transition,
}

impl PatternOp {
    pub fn new(name: &'static str, pattern: RegisterPattern, transition: Transition) -> Self {
        Self {
            name,
            pattern,
            predicate: None,
            transition,
        }
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Structural match plus the optional whole-state predicate
    pub fn matches(&self, registry: &TypeRegistry, state: &CalcState) -> bool {
        self.pattern.matches(state) && self.predicate.map_or(true, |p| p(registry, state))
    }
}

impl fmt::Debug for PatternOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternOp")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
