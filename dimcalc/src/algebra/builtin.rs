//! Builtin dimensions, units and types
//!
//! Ratios convert a value into the unit's base scale (SI); offsets are only
//! used by temperature scales.

use super::codes::DimensionId;

const L: DimensionId = DimensionId::LENGTH;
const M: DimensionId = DimensionId::MASS;
const T: DimensionId = DimensionId::TIME;
const I: DimensionId = DimensionId::CURRENT;

pub(crate) const DIMENSIONS: &[&str] = &[
    "length",
    "mass",
    "time",
    "current",
    "temperature",
    "amount",
    "luminosity",
    "angle",
    "data",
];

/// Named units, in id order after the dimensionless unit 0
pub(crate) const UNITS: &[(&str, &[(DimensionId, i32)])] = &[
    ("length", &[(L, 1)]),
    ("mass", &[(M, 1)]),
    ("time", &[(T, 1)]),
    ("current", &[(I, 1)]),
    ("temperature", &[(DimensionId::TEMPERATURE, 1)]),
    ("amount", &[(DimensionId::AMOUNT, 1)]),
    ("luminosity", &[(DimensionId::LUMINOSITY, 1)]),
    ("angle", &[(DimensionId::ANGLE, 1)]),
    ("data", &[(DimensionId::DATA, 1)]),
    ("area", &[(L, 2)]),
    ("volume", &[(L, 3)]),
    ("velocity", &[(L, 1), (T, -1)]),
    ("acceleration", &[(L, 1), (T, -2)]),
    ("force", &[(L, 1), (M, 1), (T, -2)]),
    ("energy", &[(L, 2), (M, 1), (T, -2)]),
    ("power", &[(L, 2), (M, 1), (T, -3)]),
    ("pressure", &[(L, -1), (M, 1), (T, -2)]),
    ("frequency", &[(T, -1)]),
    ("charge", &[(T, 1), (I, 1)]),
    ("voltage", &[(L, 2), (M, 1), (T, -3), (I, -1)]),
    ("resistance", &[(L, 2), (M, 1), (T, -3), (I, -2)]),
];

pub(crate) struct BuiltinType {
    pub unit: &'static str,
    pub symbol: &'static str,
    pub aliases: &'static [&'static str],
    pub ratio: f64,
    pub offset: f64,
}

const fn ty(unit: &'static str, symbol: &'static str, ratio: f64) -> BuiltinType {
    BuiltinType {
        unit,
        symbol,
        aliases: &[],
        ratio,
        offset: 0.0,
    }
}

const fn aliased(
    unit: &'static str,
    symbol: &'static str,
    aliases: &'static [&'static str],
    ratio: f64,
) -> BuiltinType {
    BuiltinType {
        unit,
        symbol,
        aliases,
        ratio,
        offset: 0.0,
    }
}

const PI: f64 = std::f64::consts::PI;

pub(crate) const TYPES: &[BuiltinType] = &[
    // Length
    ty("length", "m", 1.0),
    ty("length", "km", 1000.0),
    ty("length", "cm", 0.01),
    ty("length", "mm", 0.001),
    aliased("length", "µm", &["um"], 1e-6),
    ty("length", "nm", 1e-9),
    ty("length", "in", 0.0254),
    ty("length", "ft", 0.3048),
    ty("length", "yd", 0.9144),
    ty("length", "mi", 1609.344),
    ty("length", "nmi", 1852.0),
    // Mass
    ty("mass", "kg", 1.0),
    ty("mass", "g", 0.001),
    ty("mass", "mg", 1e-6),
    ty("mass", "t", 1000.0),
    ty("mass", "lb", 0.45359237),
    ty("mass", "oz", 0.028349523125),
    // Time
    ty("time", "s", 1.0),
    ty("time", "ms", 0.001),
    aliased("time", "µs", &["us"], 1e-6),
    ty("time", "min", 60.0),
    ty("time", "h", 3600.0),
    ty("time", "d", 86400.0),
    ty("time", "wk", 604800.0),
    ty("time", "yr", 31557600.0),
    // Current
    ty("current", "A", 1.0),
    ty("current", "mA", 0.001),
    // Temperature (base scale: kelvin)
    ty("temperature", "K", 1.0),
    BuiltinType {
        unit: "temperature",
        symbol: "°C",
        aliases: &["degC"],
        ratio: 1.0,
        offset: 273.15,
    },
    BuiltinType {
        unit: "temperature",
        symbol: "°F",
        aliases: &["degF"],
        ratio: 5.0 / 9.0,
        offset: 459.67 * 5.0 / 9.0,
    },
    aliased("temperature", "°R", &["degR"], 5.0 / 9.0),
    // Amount, luminosity
    ty("amount", "mol", 1.0),
    ty("luminosity", "cd", 1.0),
    // Angle (base scale: radian)
    ty("angle", "rad", 1.0),
    aliased("angle", "deg", &["°"], PI / 180.0),
    ty("angle", "grad", PI / 200.0),
    aliased("angle", "rev", &["turn"], 2.0 * PI),
    ty("angle", "arcmin", PI / 10800.0),
    ty("angle", "arcsec", PI / 648000.0),
    // Data (base scale: bit)
    ty("data", "bit", 1.0),
    ty("data", "B", 8.0),
    ty("data", "kB", 8e3),
    ty("data", "MB", 8e6),
    ty("data", "GB", 8e9),
    ty("data", "TB", 8e12),
    ty("data", "KiB", 8192.0),
    ty("data", "MiB", 8388608.0),
    ty("data", "GiB", 8589934592.0),
    // Area
    ty("area", "ha", 1e4),
    ty("area", "acre", 4046.8564224),
    // Volume
    ty("volume", "L", 1e-3),
    ty("volume", "mL", 1e-6),
    ty("volume", "gal", 3.785411784e-3),
    ty("volume", "qt", 9.46352946e-4),
    ty("volume", "pt", 4.73176473e-4),
    ty("volume", "floz", 2.95735295625e-5),
    // Velocity
    ty("velocity", "kph", 1.0 / 3.6),
    ty("velocity", "mph", 0.44704),
    ty("velocity", "kn", 1852.0 / 3600.0),
    // Acceleration
    ty("acceleration", "gn", 9.80665),
    // Force
    ty("force", "N", 1.0),
    ty("force", "kN", 1000.0),
    ty("force", "lbf", 4.4482216152605),
    // Energy
    ty("energy", "J", 1.0),
    ty("energy", "kJ", 1e3),
    ty("energy", "MJ", 1e6),
    ty("energy", "cal", 4.184),
    ty("energy", "kcal", 4184.0),
    ty("energy", "Wh", 3600.0),
    ty("energy", "kWh", 3.6e6),
    ty("energy", "BTU", 1055.05585262),
    ty("energy", "eV", 1.602176634e-19),
    // Power
    ty("power", "W", 1.0),
    ty("power", "mW", 1e-3),
    ty("power", "kW", 1e3),
    ty("power", "MW", 1e6),
    ty("power", "hp", 745.69987158227022),
    // Pressure
    ty("pressure", "Pa", 1.0),
    ty("pressure", "kPa", 1e3),
    ty("pressure", "MPa", 1e6),
    ty("pressure", "bar", 1e5),
    ty("pressure", "atm", 101325.0),
    ty("pressure", "psi", 6894.757293168361),
    ty("pressure", "torr", 101325.0 / 760.0),
    ty("pressure", "mmHg", 133.322387415),
    // Frequency
    ty("frequency", "Hz", 1.0),
    ty("frequency", "kHz", 1e3),
    ty("frequency", "MHz", 1e6),
    ty("frequency", "GHz", 1e9),
    ty("frequency", "rpm", 1.0 / 60.0),
    // Electrical
    ty("charge", "C", 1.0),
    ty("voltage", "V", 1.0),
    aliased("resistance", "ohm", &["Ω"], 1.0),
];
