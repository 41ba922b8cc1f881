//! Unit conversion of structured values

use super::pattern::{KindSet, RegisterSpec, ShapeSet};
use crate::algebra::Conversion;
use crate::value::{TaggedValue, ValueKind};

/// Converts a value whose shape or kind the generic scalar conversion
/// cannot handle. The caller retags the result.
#[derive(Debug, Clone)]
pub struct ConversionOp {
    pub name: &'static str,
    pub spec: RegisterSpec,
    pub convert: fn(&TaggedValue, &Conversion) -> TaggedValue,
}

pub(super) fn builtin() -> Vec<ConversionOp> {
    vec![
        ConversionOp {
            name: "components",
            spec: RegisterSpec::new(
                KindSet::COMPLEX.with(KindSet::VECTOR2).with(KindSet::VECTOR3),
                ShapeSet::ANY,
            ),
            convert: components,
        },
        ConversionOp {
            name: "magnitude",
            spec: RegisterSpec::new(KindSet::POLAR.with(KindSet::SPHERICAL), ShapeSet::ANY),
            convert: magnitude,
        },
        ConversionOp {
            name: "rational",
            spec: RegisterSpec::scalar(KindSet::RATIONAL),
            convert: rational,
        },
        ConversionOp {
            name: "elements",
            spec: RegisterSpec::new(KindSet::REAL, ShapeSet::ARRAY),
            convert: elements,
        },
    ]
}

/// Every component scaled; offsets do not apply to directed quantities
fn components(value: &TaggedValue, conversion: &Conversion) -> TaggedValue {
    let mut converted = value.clone();
    for v in converted.data_mut() {
        *v = conversion.scale_only(*v);
    }
    converted
}

/// Radius of each element scaled, angles untouched
fn magnitude(value: &TaggedValue, conversion: &Conversion) -> TaggedValue {
    let mut converted = value.clone();
    let size = value.element_size();
    for element in converted.data_mut().chunks_exact_mut(size) {
        element[0] = conversion.scale_only(element[0]);
    }
    converted
}

fn rational(value: &TaggedValue, conversion: &Conversion) -> TaggedValue {
    if conversion.is_identity() {
        return value.clone();
    }
    let d = value.data();
    TaggedValue::scalar(ValueKind::Real, &[conversion.apply(d[0] / d[1])], value.tag())
}

fn elements(value: &TaggedValue, conversion: &Conversion) -> TaggedValue {
    let mut converted = value.clone();
    for v in converted.data_mut() {
        *v = conversion.apply(*v);
    }
    converted
}
