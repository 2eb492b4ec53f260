//! Frame element types
//!
//! Every argument and result crossing the gateway is one of a closed set of
//! typed values. Scalars are represented the way the host sees them: an
//! int32 scalar is a length-1 array, a float64 scalar is a 1x1 matrix.

use serde::{Deserialize, Serialize};

/// Column-major matrix of f64, the host's native numeric array layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    /// Column-major storage, `rows * cols` elements
    pub data: Vec<f64>,
}

impl Matrix {
    /// A 1x1 matrix
    pub fn scalar(value: f64) -> Self {
        Self {
            rows: 1,
            cols: 1,
            data: vec![value],
        }
    }

    /// A 1xN row vector
    pub fn row(data: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    /// An Nx1 column vector
    pub fn column(data: Vec<f64>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Wrap column-major data; `None` if the element count does not match
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows * cols == data.len()).then_some(Self { rows, cols, data })
    }

    /// Lay out vertex-major records (one record per row) as a `rows x cols` matrix.
    ///
    /// Each record has `width` values; records narrower than `cols` are
    /// zero-padded, so 2-D positions become rows `[x, y, 0]` of a 3-column matrix.
    pub fn from_records(records: &[f64], width: usize, cols: usize) -> Self {
        if width == 0 {
            return Self {
                rows: 0,
                cols,
                data: Vec::new(),
            };
        }
        let rows = records.len() / width;
        let mut data = vec![0.0; rows * cols];
        for (row, record) in records.chunks_exact(width).enumerate() {
            for (col, value) in record.iter().take(cols).enumerate() {
                data[col * rows + row] = *value;
            }
        }
        Self { rows, cols, data }
    }

    /// Element at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(col * self.rows + row).copied()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1 && self.data.len() == 1
    }

    /// Whether `data` holds exactly `rows * cols` elements
    pub fn is_consistent(&self) -> bool {
        self.rows.checked_mul(self.cols) == Some(self.data.len())
    }
}

/// One positional element of a call frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Opcode restatement and small counts such as dimensions
    #[serde(rename = "uint8")]
    UInt8(u8),
    Bool(bool),
    /// Integer array; scalars are length 1
    #[serde(rename = "int32")]
    Int32(Vec<i32>),
    /// Float matrix; scalars are 1x1
    #[serde(rename = "float64")]
    Float64(Matrix),
    Str(String),
}

impl Value {
    pub fn int32(value: i32) -> Self {
        Value::Int32(vec![value])
    }

    pub fn float64(value: f64) -> Self {
        Value::Float64(Matrix::scalar(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    /// Row vector of floats
    pub fn floats(values: Vec<f64>) -> Self {
        Value::Float64(Matrix::row(values))
    }

    /// Host-facing type name, used in shape diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::UInt8(_) => "uint8",
            Value::Bool(_) => "logical",
            Value::Int32(_) => "int32",
            Value::Float64(_) => "double",
            Value::Str(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::UInt8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32s(&self) -> Option<&[i32]> {
        match self {
            Value::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Float64(m) => Some(m),
            _ => None,
        }
    }

    /// Scalar float, if this is a 1x1 matrix
    pub fn as_f64(&self) -> Option<f64> {
        self.as_matrix()
            .filter(|m| m.is_scalar())
            .and_then(|m| m.data.first().copied())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_records_pads_2d_positions() {
        // Two 2-D vertices laid out as a 2x3 matrix
        let m = Matrix::from_records(&[1.0, 2.0, 3.0, 4.0], 2, 3);
        assert_eq!((m.rows, m.cols), (2, 3));
        assert_eq!(m.data, vec![1.0, 3.0, 2.0, 4.0, 0.0, 0.0]);
        assert_eq!(m.get(1, 1), Some(4.0));
        assert_eq!(m.get(0, 2), Some(0.0));
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_from_column_major_checks_len() {
        assert!(Matrix::from_column_major(2, 2, vec![0.0; 4]).is_some());
        assert!(Matrix::from_column_major(2, 2, vec![0.0; 3]).is_none());
    }

    #[test]
    fn test_inconsistent_matrix_is_not_a_scalar() {
        let m = Matrix {
            rows: 1,
            cols: 1,
            data: vec![],
        };
        assert!(!m.is_scalar());
        assert!(!m.is_consistent());
        assert_eq!(Value::Float64(m).as_f64(), None);
        assert!(Matrix::row(vec![1.0, 2.0]).is_consistent());
    }

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(Value::float64(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::floats(vec![0.5, 1.0]).as_f64(), None);
        assert_eq!(Value::int32(3).as_i32s(), Some(&[3][..]));
        assert_eq!(Value::str("Fluid").as_str(), Some("Fluid"));
        assert_eq!(Value::Bool(true).type_name(), "logical");
    }

    #[test]
    fn test_value_yaml_shape() {
        let yaml = r#"
- str: Fluid-Mesh
- int32: [0, 1]
- float64: { rows: 1, cols: 2, data: [0.5, 1.5] }
- bool: true
- uint8: 11
"#;
        let values: Vec<Value> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            values,
            vec![
                Value::str("Fluid-Mesh"),
                Value::Int32(vec![0, 1]),
                Value::floats(vec![0.5, 1.5]),
                Value::Bool(true),
                Value::UInt8(11),
            ]
        );
    }
}
