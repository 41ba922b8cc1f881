//! Scalar arithmetic: typed reals, rationals and complex numbers

use super::pattern::{KindSet, PatternOp, RegisterPattern, RegisterSpec, Transition};
use super::{
    additive, binary_result, describe, multiplicative, number, operands, unary_result,
    DispatchTables,
};
use crate::algebra::{DimensionId, TypeRegistry, TypeTag};
use crate::keys::OpCode;
use crate::value::{CalcState, TaggedValue, ValueKind};
use crate::{CalcError, CalcResult};

const NUMBER: RegisterSpec = RegisterSpec::scalar(KindSet::NUMBER);
const COMPLEX_OR_NUMBER: RegisterSpec = RegisterSpec::scalar(KindSet::COMPLEX.with(KindSet::NUMBER));

/// Largest magnitude at which every integer is exactly representable
const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
const MAX_DENOMINATOR: f64 = 1e6;

fn x_number() -> RegisterPattern {
    RegisterPattern::x(NUMBER)
}

fn xy_numbers() -> RegisterPattern {
    RegisterPattern::xy(NUMBER, NUMBER)
}

fn xy_complex() -> RegisterPattern {
    RegisterPattern::xy(COMPLEX_OR_NUMBER, COMPLEX_OR_NUMBER)
}

fn x_complex() -> RegisterPattern {
    RegisterPattern::x(RegisterSpec::scalar(KindSet::COMPLEX))
}

fn untyped_x(_: &TypeRegistry, state: &CalcState) -> bool {
    state.x().tag().is_untyped()
}

fn is_angle(registry: &TypeRegistry, tag: TypeTag) -> bool {
    registry.is_dimension(tag, DimensionId::ANGLE)
}

fn incompatible(registry: &TypeRegistry, what: &str, tag: TypeTag) -> CalcError {
    CalcError::incompatible_units(format!("{} of {}", what, describe(registry, tag)))
}

pub(super) fn register(tables: &mut DispatchTables) {
    use OpCode::*;

    tables.register_pattern(
        Add,
        PatternOp::new("rational add", xy_numbers(), |r, s| rational_add(r, s, 1.0)).when(exact_pair),
    );
    tables.register_pattern(Add, PatternOp::new("real add", xy_numbers(), |r, s| real_add(r, s, 1.0)));
    tables.register_pattern(
        Add,
        PatternOp::new("complex add", xy_complex(), |r, s| complex_add(r, s, 1.0)).when(any_complex),
    );
    tables.register_pattern(
        Subtract,
        PatternOp::new("rational sub", xy_numbers(), |r, s| rational_add(r, s, -1.0)).when(exact_pair),
    );
    tables.register_pattern(Subtract, PatternOp::new("real sub", xy_numbers(), |r, s| real_add(r, s, -1.0)));
    tables.register_pattern(
        Subtract,
        PatternOp::new("complex sub", xy_complex(), |r, s| complex_add(r, s, -1.0)).when(any_complex),
    );

    tables.register_pattern(
        Multiply,
        PatternOp::new("rational mul", xy_numbers(), |r, s| rational_mul(r, s, false)).when(exact_pair),
    );
    tables.register_pattern(Multiply, PatternOp::new("real mul", xy_numbers(), |r, s| real_mul(r, s, false)));
    tables.register_pattern(
        Multiply,
        PatternOp::new("complex mul", xy_complex(), |r, s| complex_mul(r, s, false)).when(any_complex),
    );
    tables.register_pattern(
        Divide,
        PatternOp::new("rational div", xy_numbers(), |r, s| rational_mul(r, s, true)).when(exact_pair),
    );
    tables.register_pattern(Divide, PatternOp::new("real div", xy_numbers(), |r, s| real_mul(r, s, true)));
    tables.register_pattern(
        Divide,
        PatternOp::new("complex div", xy_complex(), |r, s| complex_mul(r, s, true)).when(any_complex),
    );

    tables.register_pattern(Power, PatternOp::new("real pow", xy_numbers(), real_power));
    tables.register_pattern(
        Power,
        PatternOp::new("complex pow", RegisterPattern::xy(NUMBER, COMPLEX_OR_NUMBER), complex_power),
    );
    tables.register_pattern(NthRoot, PatternOp::new("real root", xy_numbers(), nth_root));

    tables.register_pattern(Sqrt, PatternOp::new("real sqrt", x_number(), real_sqrt));
    tables.register_pattern(Sqrt, PatternOp::new("complex sqrt", x_complex(), complex_sqrt));
    tables.register_pattern(Square, PatternOp::new("square", x_number(), |r, s| real_exponent(r, s, 2)));
    tables.register_pattern(
        Square,
        PatternOp::new("complex square", x_complex(), |r, s| complex_exponent(r, s, 2)),
    );
    tables.register_pattern(
        Reciprocal,
        PatternOp::new("reciprocal", x_number(), |r, s| real_exponent(r, s, -1)),
    );
    tables.register_pattern(
        Reciprocal,
        PatternOp::new("complex reciprocal", x_complex(), |r, s| complex_exponent(r, s, -1)),
    );
    tables.register_pattern(Negate, PatternOp::new("negate", x_number(), negate));
    tables.register_pattern(Negate, PatternOp::new("complex negate", x_complex(), complex_negate));
    tables.register_pattern(Abs, PatternOp::new("abs", x_number(), abs));
    tables.register_pattern(Abs, PatternOp::new("complex abs", x_complex(), complex_abs));

    tables.register_pattern(
        Sin,
        PatternOp::new("sin", x_number(), |r, s| trig(r, s, f64::sin)).when(angle_or_untyped),
    );
    tables.register_pattern(
        Cos,
        PatternOp::new("cos", x_number(), |r, s| trig(r, s, f64::cos)).when(angle_or_untyped),
    );
    tables.register_pattern(
        Tan,
        PatternOp::new("tan", x_number(), |r, s| trig(r, s, f64::tan)).when(angle_or_untyped),
    );

    let functions: [(OpCode, &'static str, Transition); 7] = [
        (Asin, "asin", |r, s| untyped_function(r, s, "asin", f64::asin)),
        (Acos, "acos", |r, s| untyped_function(r, s, "acos", f64::acos)),
        (Atan, "atan", |r, s| untyped_function(r, s, "atan", f64::atan)),
        (Ln, "ln", |r, s| untyped_function(r, s, "ln", f64::ln)),
        (Exp, "exp", |r, s| untyped_function(r, s, "exp", f64::exp)),
        (Log10, "log", |r, s| untyped_function(r, s, "log", f64::log10)),
        (Pow10, "alog", |r, s| untyped_function(r, s, "alog", |x| 10f64.powf(x))),
    ];
    for (op, name, transition) in functions {
        tables.register_pattern(op, PatternOp::new(name, x_number(), transition).when(untyped_x));
    }
    tables.register_pattern(Ln, PatternOp::new("complex ln", x_complex(), complex_ln).when(untyped_x));
    tables.register_pattern(Exp, PatternOp::new("complex exp", x_complex(), complex_exp).when(untyped_x));

    tables.register_pattern(
        ToRadians,
        PatternOp::new("angle to rad", x_number(), |r, s| angle_to(r, s, "rad", f64::to_radians))
            .when(angle_or_untyped),
    );
    tables.register_pattern(
        ToDegrees,
        PatternOp::new("angle to deg", x_number(), |r, s| angle_to(r, s, "deg", f64::to_degrees))
            .when(angle_or_untyped),
    );

    tables.register_pattern(Fraction, PatternOp::new("fraction", x_number(), fraction));
    tables.register_pattern(MakeComplex, PatternOp::new("make complex", xy_numbers(), make_complex));
}

// ----------------------------------------------------------------------
// Predicates
// ----------------------------------------------------------------------

fn any_complex(_: &TypeRegistry, state: &CalcState) -> bool {
    state.x().kind() == ValueKind::Complex
        || state.y().is_some_and(|y| y.kind() == ValueKind::Complex)
}

/// One operand is rational and both are exact
fn exact_pair(_: &TypeRegistry, state: &CalcState) -> bool {
    let Some(y) = state.y() else {
        return false;
    };
    let x = state.x();
    (x.kind() == ValueKind::Rational || y.kind() == ValueKind::Rational)
        && exact(x).is_some()
        && exact(y).is_some()
}

fn angle_or_untyped(registry: &TypeRegistry, state: &CalcState) -> bool {
    let tag = state.x().tag();
    tag.is_untyped() || is_angle(registry, tag)
}

// ----------------------------------------------------------------------
// Typed reals
// ----------------------------------------------------------------------

fn real_add(registry: &mut TypeRegistry, state: &CalcState, sign: f64) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let value = number(y)? * sy + sign * number(x)? * sx;
    Ok(binary_result(state, TaggedValue::typed(value, tag)))
}

fn real_mul(registry: &mut TypeRegistry, state: &CalcState, quotient: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (yv, xv) = (number(y)?, number(x)?);
    if quotient && xv == 0.0 {
        return Err(CalcError::domain("division by zero"));
    }
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), quotient)?;
    let value = if quotient { yv / xv } else { yv * xv };
    Ok(binary_result(state, TaggedValue::typed(value * ratio, tag)))
}

fn real_power(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let base = number(y)?;

    if let Some(n) = x.as_integer() {
        let tag = registry
            .type_exponent(y.tag(), n)
            .ok_or_else(|| incompatible(registry, "power", y.tag()))?;
        if base == 0.0 && n < 0 {
            return Err(CalcError::domain("zero raised to a negative power"));
        }
        return Ok(binary_result(state, TaggedValue::typed(base.powi(n), tag)));
    }

    if !y.tag().is_untyped() || !x.tag().is_untyped() {
        return Err(CalcError::incompatible_units(
            "non-integer power of a typed value",
        ));
    }
    let exponent = number(x)?;
    if base < 0.0 {
        let (re, im) = c_powf((base, 0.0), exponent);
        return Ok(binary_result(state, complex(re, im, TypeTag::UNTYPED)));
    }
    let value = base.powf(exponent);
    if !value.is_finite() {
        return Err(CalcError::domain(format!("{}^{} is not finite", base, exponent)));
    }
    Ok(binary_result(state, TaggedValue::real(value)))
}

/// Y is the radicand, X the root index
fn nth_root(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let radicand = number(y)?;

    let Some(n) = x.as_integer() else {
        if !y.tag().is_untyped() || !x.tag().is_untyped() {
            return Err(CalcError::incompatible_units("non-integer root of a typed value"));
        }
        let value = radicand.powf(1.0 / number(x)?);
        if !value.is_finite() {
            return Err(CalcError::domain("root is not a real number"));
        }
        return Ok(binary_result(state, TaggedValue::real(value)));
    };

    if n <= 0 {
        return Err(CalcError::domain("root index must be a positive integer"));
    }
    let tag = registry
        .type_nth_root(y.tag(), n)
        .ok_or_else(|| incompatible(registry, "root", y.tag()))?;
    let magnitude = radicand.abs().powf(1.0 / n as f64);
    let value = match (radicand < 0.0, n % 2 == 0) {
        (false, _) => magnitude,
        (true, false) => -magnitude,
        (true, true) => return Err(CalcError::domain("even root of a negative number")),
    };
    Ok(binary_result(state, TaggedValue::typed(value, tag)))
}

fn real_sqrt(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let tag = registry
        .type_nth_root(x.tag(), 2)
        .ok_or_else(|| incompatible(registry, "square root", x.tag()))?;
    let value = number(x)?;
    let result = if value < 0.0 {
        complex(0.0, (-value).sqrt(), tag)
    } else {
        TaggedValue::typed(value.sqrt(), tag)
    };
    Ok(unary_result(state, result))
}

fn real_exponent(registry: &mut TypeRegistry, state: &CalcState, n: i32) -> CalcResult<CalcState> {
    let x = state.x();
    let tag = registry
        .type_exponent(x.tag(), n)
        .ok_or_else(|| incompatible(registry, "power", x.tag()))?;
    if let Some((num, den)) = exact(x).filter(|_| x.kind() == ValueKind::Rational) {
        let value = if n < 0 {
            rational(den, num, tag)?
        } else {
            rational(num.powi(n), den.powi(n), tag)?
        };
        return Ok(unary_result(state, value));
    }
    let value = number(x)?;
    if value == 0.0 && n < 0 {
        return Err(CalcError::domain("division by zero"));
    }
    Ok(unary_result(state, TaggedValue::typed(value.powi(n), tag)))
}

fn negate(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let mut value = x.clone();
    value.data_mut()[0] = -value.data()[0];
    Ok(unary_result(state, value))
}

fn abs(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let mut value = state.x().clone();
    value.data_mut()[0] = value.data()[0].abs();
    Ok(unary_result(state, value))
}

/// Radian value of an untyped or angle-typed number
fn radians(registry: &TypeRegistry, value: &TaggedValue) -> CalcResult<f64> {
    let ratio = registry.type_def(value.tag()).map_or(1.0, |def| def.ratio);
    Ok(number(value)? * ratio)
}

fn trig(registry: &mut TypeRegistry, state: &CalcState, f: fn(f64) -> f64) -> CalcResult<CalcState> {
    let angle = radians(registry, state.x())?;
    let value = f(angle);
    if !value.is_finite() {
        return Err(CalcError::domain(format!("undefined at {} rad", angle)));
    }
    Ok(unary_result(state, TaggedValue::real(value)))
}

fn untyped_function(
    _: &mut TypeRegistry,
    state: &CalcState,
    name: &str,
    f: fn(f64) -> f64,
) -> CalcResult<CalcState> {
    let x = number(state.x())?;
    let value = f(x);
    if !value.is_finite() {
        return Err(CalcError::domain(format!("{} is undefined for {}", name, x)));
    }
    Ok(unary_result(state, TaggedValue::real(value)))
}

fn angle_to(
    registry: &mut TypeRegistry,
    state: &CalcState,
    symbol: &str,
    untyped: fn(f64) -> f64,
) -> CalcResult<CalcState> {
    let x = state.x();
    let value = number(x)?;
    if x.tag().is_untyped() {
        return Ok(unary_result(state, TaggedValue::real(untyped(value))));
    }
    let target = registry
        .lookup(symbol)
        .ok_or_else(|| CalcError::UnknownSymbol(symbol.to_string()))?;
    let conversion = registry
        .unit_convert(x.tag(), target)
        .ok_or_else(|| CalcError::UndefinedConversion {
            from: describe(registry, x.tag()),
            to: symbol.to_string(),
        })?;
    Ok(unary_result(state, TaggedValue::typed(conversion.apply(value), target)))
}

// ----------------------------------------------------------------------
// Rationals
// ----------------------------------------------------------------------

/// Exact numerator/denominator of a rational or an integer-valued real
fn exact(value: &TaggedValue) -> Option<(f64, f64)> {
    match value.kind() {
        ValueKind::Rational if value.is_scalar() => Some((value.data()[0], value.data()[1])),
        ValueKind::Real => value
            .as_real()
            .filter(|v| v.fract() == 0.0 && v.abs() < EXACT_LIMIT)
            .map(|v| (v, 1.0)),
        _ => None,
    }
}

fn gcd(a: f64, b: f64) -> f64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b > 0.0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Normalized rational; falls back to a real once exactness is lost
pub(super) fn rational(num: f64, den: f64, tag: TypeTag) -> CalcResult<TaggedValue> {
    if den == 0.0 {
        return Err(CalcError::domain("division by zero"));
    }
    let sign = den.signum();
    let divisor = gcd(num, den).max(1.0);
    let (num, den) = (sign * num / divisor, sign * den / divisor);
    if num.abs() >= EXACT_LIMIT || den >= EXACT_LIMIT {
        return Ok(TaggedValue::typed(num / den, tag));
    }
    Ok(TaggedValue::scalar(ValueKind::Rational, &[num, den], tag))
}

fn rational_add(registry: &mut TypeRegistry, state: &CalcState, sign: f64) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    if sy != 1.0 || sx != 1.0 {
        return real_add(registry, state, sign);
    }
    let ((n1, d1), (n2, d2)) = exact_operands(y, x)?;
    let value = rational(n1 * d2 + sign * n2 * d1, d1 * d2, tag)?;
    Ok(binary_result(state, value))
}

fn rational_mul(registry: &mut TypeRegistry, state: &CalcState, quotient: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let ((n1, d1), (n2, d2)) = exact_operands(y, x)?;
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), quotient)?;
    if ratio != 1.0 {
        return real_mul(registry, state, quotient);
    }
    let value = if quotient {
        if n2 == 0.0 {
            return Err(CalcError::domain("division by zero"));
        }
        rational(n1 * d2, d1 * n2, tag)?
    } else {
        rational(n1 * n2, d1 * d2, tag)?
    };
    Ok(binary_result(state, value))
}

fn exact_operands(y: &TaggedValue, x: &TaggedValue) -> CalcResult<((f64, f64), (f64, f64))> {
    match (exact(y), exact(x)) {
        (Some(y), Some(x)) => Ok((y, x)),
        _ => Err(CalcError::type_mismatch("rational arithmetic needs exact operands")),
    }
}

/// Continued-fraction approximation with a bounded denominator
fn approximate(value: f64) -> Option<(f64, f64)> {
    if !value.is_finite() {
        return None;
    }
    let (mut h0, mut h1) = (0.0, 1.0);
    let (mut k0, mut k1) = (1.0, 0.0);
    let mut rest = value;
    for _ in 0..64 {
        let a = rest.floor();
        let (h2, k2) = (a * h1 + h0, a * k1 + k0);
        if k2 > MAX_DENOMINATOR {
            break;
        }
        (h0, h1, k0, k1) = (h1, h2, k1, k2);
        let frac = rest - a;
        if frac < 1e-12 || (h1 / k1 - value).abs() <= value.abs() * 1e-12 {
            break;
        }
        rest = 1.0 / frac;
    }
    (k1 > 0.0).then_some((h1, k1))
}

/// Real to rational, rational back to real
fn fraction(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    if x.kind() == ValueKind::Rational {
        return Ok(unary_result(state, TaggedValue::typed(number(x)?, x.tag())));
    }
    let value = number(x)?;
    let (num, den) = approximate(value)
        .ok_or_else(|| CalcError::domain(format!("{} has no fraction", value)))?;
    Ok(unary_result(state, rational(num, den, x.tag())?))
}

// ----------------------------------------------------------------------
// Complex numbers
// ----------------------------------------------------------------------

type Complex = (f64, f64);

pub(super) fn complex(re: f64, im: f64, tag: TypeTag) -> TaggedValue {
    TaggedValue::scalar(ValueKind::Complex, &[re, im], tag)
}

fn as_complex(value: &TaggedValue) -> CalcResult<Complex> {
    match value.kind() {
        ValueKind::Complex => Ok((value.data()[0], value.data()[1])),
        _ => Ok((number(value)?, 0.0)),
    }
}

fn c_mul((a, b): Complex, (c, d): Complex) -> Complex {
    (a * c - b * d, a * d + b * c)
}

fn c_div((a, b): Complex, (c, d): Complex) -> Option<Complex> {
    let den = c * c + d * d;
    if den == 0.0 {
        return None;
    }
    Some(((a * c + b * d) / den, (b * c - a * d) / den))
}

fn c_sqrt((a, b): Complex) -> Complex {
    let r = a.hypot(b);
    let re = ((r + a) / 2.0).sqrt();
    let im = ((r - a) / 2.0).sqrt();
    (re, if b < 0.0 { -im } else { im })
}

fn c_powf((a, b): Complex, n: f64) -> Complex {
    let r = a.hypot(b).powf(n);
    let theta = b.atan2(a) * n;
    (r * theta.cos(), r * theta.sin())
}

fn complex_add(registry: &mut TypeRegistry, state: &CalcState, sign: f64) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let ((a, b), (c, d)) = (as_complex(y)?, as_complex(x)?);
    let value = complex(a * sy + sign * c * sx, b * sy + sign * d * sx, tag);
    Ok(binary_result(state, value))
}

fn complex_mul(registry: &mut TypeRegistry, state: &CalcState, quotient: bool) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (lhs, rhs) = (as_complex(y)?, as_complex(x)?);
    let (tag, ratio) = multiplicative(registry, y.tag(), x.tag(), quotient)?;
    let (re, im) = if quotient {
        c_div(lhs, rhs).ok_or_else(|| CalcError::domain("division by zero"))?
    } else {
        c_mul(lhs, rhs)
    };
    Ok(binary_result(state, complex(re * ratio, im * ratio, tag)))
}

/// Complex Y raised to a real X
fn complex_power(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let base = as_complex(y)?;
    let tag = match x.as_integer() {
        Some(n) => registry
            .type_exponent(y.tag(), n)
            .ok_or_else(|| incompatible(registry, "power", y.tag()))?,
        None if y.tag().is_untyped() && x.tag().is_untyped() => TypeTag::UNTYPED,
        None => {
            return Err(CalcError::incompatible_units(
                "non-integer power of a typed value",
            ))
        }
    };
    if base == (0.0, 0.0) && number(x)? < 0.0 {
        return Err(CalcError::domain("zero raised to a negative power"));
    }
    let (re, im) = c_powf(base, number(x)?);
    Ok(binary_result(state, complex(re, im, tag)))
}

fn complex_exponent(registry: &mut TypeRegistry, state: &CalcState, n: i32) -> CalcResult<CalcState> {
    let x = state.x();
    let tag = registry
        .type_exponent(x.tag(), n)
        .ok_or_else(|| incompatible(registry, "power", x.tag()))?;
    let z = as_complex(x)?;
    let (re, im) = match n {
        2 => c_mul(z, z),
        -1 => c_div((1.0, 0.0), z).ok_or_else(|| CalcError::domain("division by zero"))?,
        _ => c_powf(z, n as f64),
    };
    Ok(unary_result(state, complex(re, im, tag)))
}

fn complex_sqrt(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let x = state.x();
    let tag = registry
        .type_nth_root(x.tag(), 2)
        .ok_or_else(|| incompatible(registry, "square root", x.tag()))?;
    let (re, im) = c_sqrt(as_complex(x)?);
    Ok(unary_result(state, complex(re, im, tag)))
}

fn complex_negate(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (re, im) = as_complex(state.x())?;
    Ok(unary_result(state, complex(-re, -im, state.x().tag())))
}

fn complex_abs(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (re, im) = as_complex(state.x())?;
    Ok(unary_result(state, TaggedValue::typed(re.hypot(im), state.x().tag())))
}

fn complex_ln(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (re, im) = as_complex(state.x())?;
    let r = re.hypot(im);
    if r == 0.0 {
        return Err(CalcError::domain("logarithm of zero"));
    }
    Ok(unary_result(state, complex(r.ln(), im.atan2(re), TypeTag::UNTYPED)))
}

fn complex_exp(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (re, im) = as_complex(state.x())?;
    let r = re.exp();
    Ok(unary_result(state, complex(r * im.cos(), r * im.sin(), TypeTag::UNTYPED)))
}

/// Y real part, X imaginary part
fn make_complex(registry: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let (y, x) = operands(state)?;
    let (tag, sy, sx) = additive(registry, y.tag(), x.tag())?;
    let value = complex(number(y)? * sy, number(x)? * sx, tag);
    Ok(binary_result(state, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(y: TaggedValue, x: TaggedValue) -> CalcState {
        let mut state = CalcState::new(4);
        state.set_register(1, y);
        state.set_register(0, x);
        state
    }

    fn apply(registry: &mut TypeRegistry, s: &CalcState, op: OpCode) -> CalcResult<CalcState> {
        DispatchTables::new().apply(registry, s, op)
    }

    #[test]
    fn rationals_stay_exact() {
        let mut registry = TypeRegistry::new();
        let third = rational(1.0, 3.0, TypeTag::UNTYPED).unwrap();
        let sixth = rational(1.0, 6.0, TypeTag::UNTYPED).unwrap();
        let next = apply(&mut registry, &state(third, sixth), OpCode::Add).unwrap();
        assert_eq!(next.x().kind(), ValueKind::Rational);
        assert_eq!(next.x().data(), &[1.0, 2.0]);
    }

    #[test]
    fn fraction_toggles_between_real_and_rational() {
        let mut registry = TypeRegistry::new();
        let s = state(TaggedValue::real(0.0), TaggedValue::real(0.75));
        let next = apply(&mut registry, &s, OpCode::Fraction).unwrap();
        assert_eq!(next.x().data(), &[3.0, 4.0]);
        let back = apply(&mut registry, &next, OpCode::Fraction).unwrap();
        assert_eq!(back.x().as_real(), Some(0.75));
    }

    #[test]
    fn square_root_of_negative_is_complex() {
        let mut registry = TypeRegistry::new();
        let s = state(TaggedValue::real(0.0), TaggedValue::real(-4.0));
        let next = apply(&mut registry, &s, OpCode::Sqrt).unwrap();
        assert_eq!(next.x(), &complex(0.0, 2.0, TypeTag::UNTYPED));
    }

    #[test]
    fn square_root_halves_unit_exponents() {
        let mut registry = TypeRegistry::new();
        let m = registry.lookup("m").unwrap();
        let m2 = registry.type_exponent(m, 2).unwrap();
        let s = state(TaggedValue::real(0.0), TaggedValue::typed(9.0, m2));
        let next = apply(&mut registry, &s, OpCode::Sqrt).unwrap();
        assert_eq!(next.x().tag(), m);
        assert_eq!(next.x().as_real(), Some(3.0));
    }

    #[test]
    fn trig_accepts_degrees() {
        let mut registry = TypeRegistry::new();
        let deg = registry.lookup("deg").unwrap();
        let s = state(TaggedValue::real(0.0), TaggedValue::typed(90.0, deg));
        let next = apply(&mut registry, &s, OpCode::Sin).unwrap();
        assert!((next.x().as_real().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn logarithm_of_typed_value_has_no_pattern() {
        let mut registry = TypeRegistry::new();
        let m = registry.lookup("m").unwrap();
        let s = state(TaggedValue::real(0.0), TaggedValue::typed(2.0, m));
        let err = apply(&mut registry, &s, OpCode::Ln).unwrap_err();
        assert!(matches!(err, CalcError::TypeMismatch(_)));
    }

    #[test]
    fn complex_product() {
        let mut registry = TypeRegistry::new();
        let s = state(complex(1.0, 2.0, TypeTag::UNTYPED), complex(3.0, -1.0, TypeTag::UNTYPED));
        let next = apply(&mut registry, &s, OpCode::Multiply).unwrap();
        assert_eq!(next.x().data(), &[5.0, 5.0]);
    }

    #[test]
    fn typed_division_by_zero_is_a_domain_error() {
        let mut registry = TypeRegistry::new();
        let m = registry.lookup("m").unwrap();
        let s = state(TaggedValue::typed(1.0, m), TaggedValue::real(0.0));
        let err = apply(&mut registry, &s, OpCode::Divide).unwrap_err();
        assert!(matches!(err, CalcError::Domain(_)));
    }

    #[test]
    fn odd_root_of_negative_is_real_even_is_rejected() {
        let mut registry = TypeRegistry::new();
        let s = state(TaggedValue::real(-8.0), TaggedValue::real(3.0));
        // plain table yields NaN for powf on a negative base
        let next = apply(&mut registry, &s, OpCode::NthRoot).unwrap();
        assert!((next.x().as_real().unwrap() + 2.0).abs() < 1e-12);
        let s = state(TaggedValue::real(-16.0), TaggedValue::real(4.0));
        assert!(matches!(
            apply(&mut registry, &s, OpCode::NthRoot),
            Err(CalcError::Domain(_))
        ));
    }
}
