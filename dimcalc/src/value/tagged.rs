use crate::algebra::TypeTag;
use crate::{CalcError, CalcResult};
use serde::{Deserialize, Serialize};

/// Numeric variant of a [`TaggedValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Real,
    /// `[numerator, denominator]`
    Rational,
    /// `[re, im]`
    Complex,
    /// `[x, y]`
    Vector2,
    /// `[r, θ]`, θ in radians
    Polar,
    /// `[x, y, z]`
    Vector3,
    /// `[r, θ, φ]`, azimuth θ and inclination φ in radians
    Spherical,
}

impl ValueKind {
    /// Number of doubles per element
    pub fn element_size(self) -> usize {
        match self {
            ValueKind::Real => 1,
            ValueKind::Rational
            | ValueKind::Complex
            | ValueKind::Vector2
            | ValueKind::Polar => 2,
            ValueKind::Vector3 | ValueKind::Spherical => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Real => "real",
            ValueKind::Rational => "rational",
            ValueKind::Complex => "complex",
            ValueKind::Vector2 => "vector2",
            ValueKind::Polar => "polar",
            ValueKind::Vector3 => "vector3",
            ValueKind::Spherical => "spherical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Row,
    Column,
    Matrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatStyle {
    #[default]
    Decimal,
    Scientific,
}

/// Display format carried with a value; only the renderer interprets it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecord {
    pub style: FormatStyle,
    pub digits: u8,
}

impl Default for FormatRecord {
    fn default() -> Self {
        Self {
            style: FormatStyle::Decimal,
            digits: 10,
        }
    }
}

/// Shape-aware tagged numeric value backed by one flat buffer.
///
/// Elements are stored column-major; each element occupies
/// `kind.element_size()` consecutive doubles. The buffer length is always
/// `element_size × rows × cols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    kind: ValueKind,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    tag: TypeTag,
    #[serde(default)]
    format: FormatRecord,
}

impl Default for TaggedValue {
    fn default() -> Self {
        Self::real(0.0)
    }
}

impl TaggedValue {
    /// Zero-filled value of the given kind and shape
    pub fn zeros(kind: ValueKind, rows: usize, cols: usize) -> Self {
        Self {
            kind,
            rows,
            cols,
            data: vec![0.0; kind.element_size() * rows * cols],
            tag: TypeTag::UNTYPED,
            format: FormatRecord::default(),
        }
    }

    pub fn real(value: f64) -> Self {
        Self::scalar(ValueKind::Real, &[value], TypeTag::UNTYPED)
    }

    pub fn typed(value: f64, tag: TypeTag) -> Self {
        Self::scalar(ValueKind::Real, &[value], tag)
    }

    /// Scalar of any kind from its components; missing components are zero
    pub fn scalar(kind: ValueKind, components: &[f64], tag: TypeTag) -> Self {
        let mut value = Self::zeros(kind, 1, 1);
        for (slot, component) in value.data.iter_mut().zip(components) {
            *slot = *component;
        }
        value.tag = tag;
        value
    }

    /// Array built from a column-major buffer
    pub fn array(
        kind: ValueKind,
        rows: usize,
        cols: usize,
        data: Vec<f64>,
        tag: TypeTag,
    ) -> CalcResult<Self> {
        if rows == 0 || cols == 0 || data.len() != kind.element_size() * rows * cols {
            return Err(CalcError::shape(format!(
                "{} values do not fill a {}x{} {} array",
                data.len(),
                rows,
                cols,
                kind.name()
            )));
        }
        Ok(Self {
            kind,
            rows,
            cols,
            data,
            tag,
            format: FormatRecord::default(),
        })
    }

    /// Row of real values
    pub fn row(values: Vec<f64>, tag: TypeTag) -> CalcResult<Self> {
        let cols = values.len();
        Self::array(ValueKind::Real, 1, cols, values, tag)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn element_size(&self) -> usize {
        self.kind.element_size()
    }

    /// Number of elements (not doubles)
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> Shape {
        match (self.rows, self.cols) {
            (1, 1) => Shape::Scalar,
            (1, _) => Shape::Row,
            (_, 1) => Shape::Column,
            _ => Shape::Matrix,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.shape() == Shape::Scalar
    }

    /// Raw components in storage order
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn set_tag(&mut self, tag: TypeTag) {
        self.tag = tag;
    }

    pub fn with_tag(mut self, tag: TypeTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn format(&self) -> FormatRecord {
        self.format
    }

    pub fn set_format(&mut self, format: FormatRecord) {
        self.format = format;
    }

    /// Buffer index of component `offset` of element (row, col); 1-based
    pub fn index(&self, row: usize, col: usize, offset: usize) -> Option<usize> {
        let elem = self.element_size();
        if row == 0 || col == 0 || row > self.rows || col > self.cols || offset >= elem {
            return None;
        }
        Some((col - 1) * elem * self.rows + (row - 1) * elem + offset)
    }

    pub fn get(&self, row: usize, col: usize, offset: usize) -> Option<f64> {
        self.index(row, col, offset).map(|i| self.data[i])
    }

    pub fn set(&mut self, row: usize, col: usize, offset: usize, value: f64) -> CalcResult<()> {
        let i = self.index(row, col, offset).ok_or_else(|| {
            CalcError::shape(format!(
                "({}, {}) is outside a {}x{} array",
                row, col, self.rows, self.cols
            ))
        })?;
        self.data[i] = value;
        Ok(())
    }

    /// All components of element (row, col)
    pub fn element(&self, row: usize, col: usize) -> Option<&[f64]> {
        let start = self.index(row, col, 0)?;
        Some(&self.data[start..start + self.element_size()])
    }

    /// Element `n` (0-based) in storage order
    pub fn element_at(&self, n: usize) -> Option<&[f64]> {
        let elem = self.element_size();
        self.data.get(n * elem..(n + 1) * elem)
    }

    pub fn elements(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.element_size())
    }

    /// Reallocate to a zero-filled buffer of exactly the new capacity
    pub fn reshape(&mut self, kind: ValueKind, rows: usize, cols: usize) {
        self.kind = kind;
        self.rows = rows;
        self.cols = cols;
        self.data = vec![0.0; kind.element_size() * rows * cols];
    }

    /// Value of a real scalar
    pub fn as_real(&self) -> Option<f64> {
        match (self.kind, self.is_scalar()) {
            (ValueKind::Real, true) => Some(self.data[0]),
            _ => None,
        }
    }

    /// Value of a real or rational scalar as a double
    pub fn as_number(&self) -> Option<f64> {
        match (self.kind, self.is_scalar()) {
            (ValueKind::Real, true) => Some(self.data[0]),
            (ValueKind::Rational, true) => Some(self.data[0] / self.data[1]),
            _ => None,
        }
    }

    /// Untyped real scalar holding an exact integer
    pub fn as_integer(&self) -> Option<i32> {
        let value = self.as_real().filter(|_| self.tag.is_untyped())?;
        if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
            Some(value as i32)
        } else {
            None
        }
    }

    /// Magnitude used by the display format switch; only for real scalars
    pub fn display_magnitude(&self) -> Option<f64> {
        self.as_number().map(f64::abs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major_addressing() {
        let value = TaggedValue::array(
            ValueKind::Complex,
            2,
            2,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            TypeTag::UNTYPED,
        )
        .unwrap();
        assert_eq!(value.index(1, 1, 0), Some(0));
        assert_eq!(value.index(2, 1, 1), Some(3));
        assert_eq!(value.index(1, 2, 0), Some(4));
        assert_eq!(value.element(2, 2), Some(&[7.0, 8.0][..]));
        assert_eq!(value.index(3, 1, 0), None);
        assert_eq!(value.index(1, 1, 2), None);
        assert_eq!(value.shape(), Shape::Matrix);
    }

    #[test]
    fn reshape_zero_fills_exact_capacity() {
        let mut value = TaggedValue::real(4.0);
        value.reshape(ValueKind::Spherical, 1, 3);
        assert_eq!(value.data().len(), 9);
        assert!(value.data().iter().all(|v| *v == 0.0));
        assert_eq!(value.shape(), Shape::Row);
    }

    #[test]
    fn array_rejects_wrong_buffer_length() {
        let err = TaggedValue::array(ValueKind::Vector3, 1, 2, vec![0.0; 5], TypeTag::UNTYPED);
        assert!(matches!(err, Err(CalcError::ShapeError(_))));
    }

    #[test]
    fn integer_view_requires_untyped_whole_number() {
        assert_eq!(TaggedValue::real(3.0).as_integer(), Some(3));
        assert_eq!(TaggedValue::real(3.5).as_integer(), None);
        assert_eq!(TaggedValue::typed(3.0, TypeTag::new(1, 0)).as_integer(), None);
    }
}
