//! Vectors, polar forms and real arrays

use super::pattern::{KindSet, PatternOp, RegisterPattern, RegisterSpec, ShapeSet};
use super::{
    additive, binary_result, consume, multiplicative, number, operands, unary_result,
    DispatchTables,
};
use crate::algebra::{TypeRegistry, TypeTag};
use crate::keys::OpCode;
use crate::value::{CalcState, Shape, TaggedValue, ValueKind};
use crate::{CalcError, CalcResult};

const NUMBER: RegisterSpec = RegisterSpec::scalar(KindSet::NUMBER);
const VECTOR: RegisterSpec = RegisterSpec::scalar(KindSet::VECTOR);
const REAL_ARRAY: RegisterSpec = RegisterSpec::new(KindSet::REAL, ShapeSet::ARRAY);
const REAL_ANY: RegisterSpec = RegisterSpec::new(KindSet::REAL, ShapeSet::ANY);
const REAL_ROWISH: RegisterSpec = RegisterSpec::new(KindSet::REAL, ShapeSet::SCALAR.with(ShapeSet::ROW));

pub(super) fn register(tables: &mut DispatchTables) {
    use OpCode::*;

    tables.register_pattern(
        MakeVector2,
        PatternOp::new("make vector2", RegisterPattern::xy(NUMBER, NUMBER), make_vector2),
    );
    tables.register_pattern(
        MakeVector3,
        PatternOp::new("make vector3", RegisterPattern::xyz(NUMBER, NUMBER, NUMBER), make_vector3),
    );

    tables.register_pattern(
        Add,
        PatternOp::new("vector add", RegisterPattern::xy(VECTOR, VECTOR), |r, s| vector_add(r, s, 1.0))
            .when(same_kind),
    );
    tables.register_pattern(
        Subtract,
        PatternOp::new("vector sub", RegisterPattern::xy(VECTOR, VECTOR), |r, s| vector_add(r, s, -1.0))
            .when(same_kind),
    );
    tables.register_pattern(
        Multiply,
        PatternOp::new("vector scale", RegisterPattern::xy(NUMBER, VECTOR), |r, s| vector_scale(r, s, false)),
    );
    tables.register_pattern(
        Multiply,
        PatternOp::new("scale vector", RegisterPattern::xy(VECTOR, NUMBER), scale_vector),
    );
    tables.register_pattern(
        Divide,
        PatternOp::new("vector divide", RegisterPattern::xy(NUMBER, VECTOR), |r, s| vector_scale(r, s, true)),
    );
    tables.register_pattern(Negate, PatternOp::new("vector negate", RegisterPattern::x(VECTOR), vector_negate));
    tables.register_pattern(Abs, PatternOp::new("vector magnitude", RegisterPattern::x(VECTOR), magnitude));
    tables.register_pattern(
        Dot,
        PatternOp::new("vector dot", RegisterPattern::xy(VECTOR, VECTOR), vector_dot).when(same_rank),
    );
    tables.register_pattern(
        Cross,
        PatternOp::new("vector cross", RegisterPattern::xy(VECTOR, VECTOR), vector_cross).when(same_rank),
    );
    tables.register_pattern(
        ToPolar,
        PatternOp::new(
            "to polar",
            RegisterPattern::x(RegisterSpec::scalar(
                KindSet::VECTOR2.with(KindSet::VECTOR3).with(KindSet::COMPLEX),
            )),
            to_polar,
        ),
    );
    tables.register_pattern(
        ToRect,
        PatternOp::new(
            "to rect",
            RegisterPattern::x(RegisterSpec::scalar(KindSet::POLAR.with(KindSet::SPHERICAL))),
            to_rect,
        ),
    );
    tables.register_pattern(
        Split,
        PatternOp::new(
            "split components",
            RegisterPattern::x(RegisterSpec::scalar(KindSet::ANY)),
            split_components,
        )
        .when(|_, s| s.x().kind() != ValueKind::Real),
    );
    tables.register_pattern(
        Split,
        PatternOp::new(
            "split array",
            RegisterPattern::x(RegisterSpec::new(KindSet::REAL, ShapeSet::LINEAR)),
            split_array,
        ),
    );

    // Arrays
    tables.register_pattern(
        Add,
        PatternOp::new("array add", RegisterPattern::xy(REAL_ARRAY, REAL_ARRAY), |r, s| {
            array_add(r, s, 1.0)
        }),
    );
    tables.register_pattern(
        Subtract,
        PatternOp::new("array sub", RegisterPattern::xy(REAL_ARRAY, REAL_ARRAY), |r, s| {
            array_add(r, s, -1.0)
        }),
    );
    tables.register_pattern(
        Multiply,
        PatternOp::new("matrix product", RegisterPattern::xy(REAL_ARRAY, REAL_ARRAY), matrix_product),
    );
    tables.register_pattern(
        Multiply,
        PatternOp::new("array scale", RegisterPattern::xy(REAL_ANY, REAL_ANY), |r, s| {
            array_scale(r, s, false)
        }),
    );
    tables.register_pattern(
        Divide,
        PatternOp::new("array divide", RegisterPattern::xy(NUMBER, REAL_ARRAY), |r, s| {
            array_scale(r, s, true)
        }),
    );
    tables.register_pattern(
        Negate,
        PatternOp::new("array negate", RegisterPattern::x(REAL_ARRAY), |_, s| {
            Ok(map_array(s, |v| -v))
        }),
    );
    tables.register_pattern(
        Abs,
        PatternOp::new("array abs", RegisterPattern::x(REAL_ARRAY), |_, s| {
            Ok(map_array(s, f64::abs))
        }),
    );
    tables.register_pattern(
        Dot,
        PatternOp::new("array dot", RegisterPattern::xy(REAL_ARRAY, REAL_ARRAY), array_dot),
    );
    tables.register_pattern(
        Concat,
        PatternOp::new("concat rows", RegisterPattern::xy(REAL_ROWISH, REAL_ROWISH), |r, s| {
            concat(r, s, true)
        }),
    );
    tables.register_pattern(
        Concat,
        PatternOp::new(
            "concat columns",
            RegisterPattern::xy(
                RegisterSpec::new(KindSet::REAL, ShapeSet::SCALAR.with(ShapeSet::COLUMN)),
                RegisterSpec::new(KindSet::REAL, ShapeSet::SCALAR.with(ShapeSet::COLUMN)),
            ),
            |r, s| concat(r, s, false),
        ),
    );
    tables.register_pattern(
        Stack,
        PatternOp::new(
            "stack rows",
            RegisterPattern::xy(
                RegisterSpec::new(KindSet::REAL, ShapeSet::SCALAR.with(ShapeSet::ROW).with(ShapeSet::MATRIX)),
                REAL_ANY,
            ),
            stack_rows,
        ),
    );
    tables.register_pattern(
        Transpose,
        PatternOp::new(
            "transpose",
            RegisterPattern::x(RegisterSpec::new(KindSet::ANY, ShapeSet::ARRAY)),
            transpose,
        ),
    );
}

fn same_kind(_: &TypeRegistry, state: &CalcState) -> bool {
    state.y().is_some_and(|y| y.kind() == state.x().kind())
}

fn same_rank(_: &TypeRegistry, state: &CalcState) -> bool {
    state
        .y()
        .is_some_and(|y| y.element_size() == state.x().element_size())
}

// ----------------------------------------------------------------------
// Coordinate transforms
// ----------------------------------------------------------------------

/// Cartesian components of any vector kind
fn rect(value: &TaggedValue) -> Vec<f64> {
    let d = value.data();
    match value.kind() {
        ValueKind::Polar => vec![d[0] * d[1].cos(), d[0] * d[1].sin()],
        ValueKind::Spherical => vec![
            d[0] * d[2].sin() * d[1].cos(),
            d[0] * d[2].sin() * d[1].sin(),
            d[0] * d[2].cos(),
        ],
        _ => d.to_vec(),
    }
}

/// Cartesian components re-expressed in `kind`
fn from_rect(kind: ValueKind, c: &[f64], tag: TypeTag) -> TaggedValue {
    let components = match kind {
        ValueKind::Polar => vec![c[0].hypot(c[1]), c[1].atan2(c[0])],
        ValueKind::Spherical => {
            let r = (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt();
            let phi = if r == 0.0 { 0.0 } else { (c[2] / r).acos() };
            vec![r, c[1].atan2(c[0]), phi]
        }
        _ => c.to_vec(),
    };
    TaggedValue::scalar(kind, &components, tag)
}

fn norm(c: &[f64]) -> f64 {
    c.iter().map(|v| v * v).sum::<f64>().sqrt()
}

// ----------------------------------------------------------------------
// Vectors
// ----------------------------------------------------------------------

fn make_vector2(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let value = TaggedValue::scalar(ValueKind::Vector2, &[number(y)? * sy, number(x)? * sx], tag);
    Ok(binary_result(state, value))
}

fn make_vector3(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let z = state
        .z()
        .ok_or_else(|| CalcError::shape("vector3 needs three registers"))?;
    let (tag, sz, sy) = additive(registry, z.tag(), y.tag())?;
    let (tag, s_zy, sx) = additive(registry, tag, x.tag())?;
    let components = [
        number(z)? * sz * s_zy,
        number(y)? * sy * s_zy,
        number(x)? * sx,
    ];
    let value = TaggedValue::scalar(ValueKind::Vector3, &components, tag);
    Ok(consume(state, 3, value))
}

fn vector_add(registry: &mut TypeRegistry, state: &CalcState, sign: f64) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let sum: Vec<f64> = rect(y)
        .iter()
        .zip(rect(x))
        .map(|(a, b)| a * sy + sign * b * sx)
        .collect();
    Ok(binary_result(state, from_rect(y.kind(), &sum, tag)))
}

/// Vector in Y times or divided by the number in X
fn vector_scale(registry: &mut TypeRegistry, state: &CalcState, quotient: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let factor = number(x)?;
    if quotient && factor == 0.0 {
        return Err(CalcError::domain("division by zero"));
    }
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), quotient)?;
    let factor = if quotient { ratio / factor } else { ratio * factor };
    let scaled: Vec<f64> = rect(y).iter().map(|c| c * factor).collect();
    Ok(binary_result(state, from_rect(y.kind(), &scaled, tag)))
}

/// Number in Y times the vector in X
fn scale_vector(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), false)?;
    let factor = number(y)? * ratio;
    let scaled: Vec<f64> = rect(x).iter().map(|c| c * factor).collect();
    Ok(binary_result(state, from_rect(x.kind(), &scaled, tag)))
}

fn vector_negate(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let negated: Vec<f64> = rect(x).iter().map(|c| -c).collect();
    Ok(unary_result(state, from_rect(x.kind(), &negated, x.tag())))
}

fn magnitude(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    Ok(unary_result(state, TaggedValue::typed(norm(&rect(x)), x.tag())))
}

fn vector_dot(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), false)?;
    let dot: f64 = rect(y).iter().zip(rect(x)).map(|(a, b)| a * b).sum();
    Ok(binary_result(state, TaggedValue::typed(dot * ratio, tag)))
}

/// Vector3 cross product; for planar vectors the z component as a number
fn vector_cross(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), false)?;
    let (a, b) = (rect(y), rect(x));
    let value = if a.len() == 2 {
        TaggedValue::typed((a[0] * b[1] - a[1] * b[0]) * ratio, tag)
    } else {
        let cross = [
            (a[1] * b[2] - a[2] * b[1]) * ratio,
            (a[2] * b[0] - a[0] * b[2]) * ratio,
            (a[0] * b[1] - a[1] * b[0]) * ratio,
        ];
        TaggedValue::scalar(ValueKind::Vector3, &cross, tag)
    };
    Ok(binary_result(state, value))
}

fn to_polar(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let kind = match x.kind() {
        ValueKind::Vector3 => ValueKind::Spherical,
        _ => ValueKind::Polar,
    };
    Ok(unary_result(state, from_rect(kind, x.data(), x.tag())))
}

fn to_rect(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let kind = match x.kind() {
        ValueKind::Spherical => ValueKind::Vector3,
        _ => ValueKind::Vector2,
    };
    Ok(unary_result(state, from_rect(kind, &rect(x), x.tag())))
}

/// Spread the components of X over the stack, first component deepest.
///
/// Angles of polar forms come out in radians; a rational splits into its
/// numerator, keeping the type, and an untyped denominator.
fn split_components(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let tag = x.tag();
    let radians = registry.lookup("rad").unwrap_or(TypeTag::UNTYPED);
    let d = x.data();
    let parts: Vec<TaggedValue> = match x.kind() {
        ValueKind::Rational => vec![TaggedValue::typed(d[0], tag), TaggedValue::real(d[1])],
        ValueKind::Polar => vec![TaggedValue::typed(d[0], tag), TaggedValue::typed(d[1], radians)],
        ValueKind::Spherical => vec![
            TaggedValue::typed(d[0], tag),
            TaggedValue::typed(d[1], radians),
            TaggedValue::typed(d[2], radians),
        ],
        _ => d.iter().map(|c| TaggedValue::typed(*c, tag)).collect(),
    };
    spread(state, parts)
}

fn split_array(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let parts = x
        .data()
        .iter()
        .map(|v| TaggedValue::typed(*v, x.tag()))
        .collect();
    spread(state, parts)
}

fn spread(state: &CalcState, parts: Vec<TaggedValue>) -> CalcResult<CalcState> {
    if parts.len() > state.register_count() {
        return Err(CalcError::shape(format!(
            "{} components do not fit in {} registers",
            parts.len(),
            state.register_count()
        )));
    }
    let mut next = state.clone();
    next.last_x = state.x().clone();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            next.no_lift = false;
            next.stack_lift();
        }
        next.set_x(part);
    }
    next.no_lift = false;
    Ok(next)
}

// ----------------------------------------------------------------------
// Real arrays
// ----------------------------------------------------------------------

fn map_array(state: &CalcState, f: fn(f64) -> f64) -> CalcState {
    let mut value = state.x().clone();
    for v in value.data_mut() {
        *v = f(*v);
    }
    unary_result(state, value)
}

fn array_add(registry: &mut TypeRegistry, state: &CalcState, sign: f64) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    if (y.rows(), y.cols()) != (x.rows(), x.cols()) {
        return Err(CalcError::shape(format!(
            "cannot add a {}x{} array and a {}x{} array",
            y.rows(),
            y.cols(),
            x.rows(),
            x.cols()
        )));
    }
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let data = y
        .data()
        .iter()
        .zip(x.data())
        .map(|(a, b)| a * sy + sign * b * sx)
        .collect();
    let value = TaggedValue::array(ValueKind::Real, y.rows(), y.cols(), data, tag)?;
    Ok(binary_result(state, value))
}

/// Y (r×k) times X (k×c)
fn matrix_product(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    if y.cols() != x.rows() {
        return Err(CalcError::shape(format!(
            "cannot multiply a {}x{} array by a {}x{} array",
            y.rows(),
            y.cols(),
            x.rows(),
            x.cols()
        )));
    }
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), false)?;
    let (rows, inner, cols) = (y.rows(), y.cols(), x.cols());
    let mut data = vec![0.0; rows * cols];
    for c in 0..cols {
        for r in 0..rows {
            let sum: f64 = (0..inner)
                .map(|k| y.data()[k * rows + r] * x.data()[c * inner + k])
                .sum();
            data[c * rows + r] = sum * ratio;
        }
    }
    let value = TaggedValue::array(ValueKind::Real, rows, cols, data, tag)?;
    Ok(binary_result(state, value))
}

/// Array times number in either order, or array divided by a number
fn array_scale(registry: &mut TypeRegistry, state: &CalcState, quotient: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (array, factor) = match (y.is_scalar(), x.is_scalar()) {
        (false, true) => (y, number(x)?),
        (true, false) if !quotient => (x, number(y)?),
        _ => return Err(CalcError::shape("expected one array and one number")),
    };
    if quotient && factor == 0.0 {
        return Err(CalcError::domain("division by zero"));
    }
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), quotient)?;
    let factor = if quotient { ratio / factor } else { ratio * factor };
    let data = array.data().iter().map(|v| v * factor).collect();
    let value = TaggedValue::array(ValueKind::Real, array.rows(), array.cols(), data, tag)?;
    Ok(binary_result(state, value))
}

fn array_dot(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    if y.shape() == Shape::Matrix || x.shape() == Shape::Matrix || y.len() != x.len() {
        return Err(CalcError::shape("dot product needs two arrays of equal length"));
    }
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), false)?;
    let dot: f64 = y.data().iter().zip(x.data()).map(|(a, b)| a * b).sum();
    Ok(binary_result(state, TaggedValue::typed(dot * ratio, tag)))
}

/// Y followed by X, as a row or a column
fn concat(registry: &mut TypeRegistry, state: &CalcState, row: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let data: Vec<f64> = y
        .data()
        .iter()
        .map(|v| v * sy)
        .chain(x.data().iter().map(|v| v * sx))
        .collect();
    let len = data.len();
    let value = if row {
        TaggedValue::array(ValueKind::Real, 1, len, data, tag)?
    } else {
        TaggedValue::array(ValueKind::Real, len, 1, data, tag)?
    };
    Ok(binary_result(state, value))
}

/// Rows of X appended below the rows of Y
fn stack_rows(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    if y.cols() != x.cols() {
        return Err(CalcError::shape(format!(
            "cannot stack {} columns on {} columns",
            x.cols(),
            y.cols()
        )));
    }
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let (rows, cols) = (y.rows() + x.rows(), y.cols());
    let mut data = Vec::with_capacity(rows * cols);
    for c in 0..cols {
        data.extend(y.data()[c * y.rows()..(c + 1) * y.rows()].iter().map(|v| v * sy));
        data.extend(x.data()[c * x.rows()..(c + 1) * x.rows()].iter().map(|v| v * sx));
    }
    let value = TaggedValue::array(ValueKind::Real, rows, cols, data, tag)?;
    Ok(binary_result(state, value))
}

fn transpose(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let (rows, cols) = (x.rows(), x.cols());
    let mut value = TaggedValue::zeros(x.kind(), cols, rows).with_tag(x.tag());
    for r in 1..=rows {
        for c in 1..=cols {
            if let Some(element) = x.element(r, c) {
                for (offset, component) in element.iter().enumerate() {
                    value.set(c, r, offset, *component)?;
                }
            }
        }
    }
    Ok(unary_result(state, value))
}
