//! Call frames and positional argument decoding

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::opcode::Operation;
use crate::value::{Matrix, Value};

/// Ordered positional values of one call or one result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    values: Vec<Value>,
}

impl Frame {
    /// Frame with no result slots
    pub fn empty() -> Self {
        Self::default()
    }

    /// Argument frame for `opcode`: the opcode restated, then `args`
    pub fn call(opcode: u8, args: impl IntoIterator<Item = Value>) -> Self {
        let mut values = vec![Value::UInt8(opcode)];
        values.extend(args);
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Frame {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl From<Value> for Frame {
    fn from(value: Value) -> Self {
        Self {
            values: vec![value],
        }
    }
}

/// Sequential cursor over the declared arguments of one opcode.
///
/// Every accessor consumes one position and checks its element type;
/// [`FrameReader::finish`] rejects trailing arguments.
pub struct FrameReader<'a> {
    operation: Operation,
    values: &'a [Value],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    /// Position the reader after `args[0]`, optionally checking the opcode echo
    pub fn new(
        operation: Operation,
        opcode: u8,
        frame: &'a Frame,
        verify_echo: bool,
    ) -> GatewayResult<Self> {
        let Some(first) = frame.get(0) else {
            return Err(GatewayError::shape(operation, "empty frame, opcode echo missing"));
        };
        if verify_echo && first.as_u8() != Some(opcode) {
            return Err(GatewayError::shape(
                operation,
                format!("args[0] must restate opcode {}, got {:?}", opcode, first),
            ));
        }
        Ok(Self {
            operation,
            values: frame.values(),
            pos: 1,
        })
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Shape error attributed to this reader's operation
    pub fn mismatch(&self, detail: impl Into<String>) -> GatewayError {
        GatewayError::shape(self.operation, detail)
    }

    fn next(&mut self, what: &str) -> GatewayResult<&'a Value> {
        let values = self.values;
        let value = values.get(self.pos).ok_or_else(|| {
            self.mismatch(format!("missing argument {} at position {}", what, self.pos))
        })?;
        self.pos += 1;
        Ok(value)
    }

    fn wrong_type(&self, what: &str, expected: &str, got: &Value) -> GatewayError {
        self.mismatch(format!(
            "{} at position {} must be {}, got {}",
            what,
            self.pos - 1,
            expected,
            got.type_name()
        ))
    }

    pub fn str(&mut self, what: &str) -> GatewayResult<&'a str> {
        let value = self.next(what)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_type(what, "string", value))
    }

    pub fn bool(&mut self, what: &str) -> GatewayResult<bool> {
        let value = self.next(what)?;
        value
            .as_bool()
            .ok_or_else(|| self.wrong_type(what, "logical", value))
    }

    pub fn i32s(&mut self, what: &str) -> GatewayResult<&'a [i32]> {
        let value = self.next(what)?;
        value
            .as_i32s()
            .ok_or_else(|| self.wrong_type(what, "int32", value))
    }

    /// An int32 scalar (length-1 array)
    pub fn i32(&mut self, what: &str) -> GatewayResult<i32> {
        match self.i32s(what)? {
            [v] => Ok(*v),
            other => Err(self.mismatch(format!(
                "{} must be an int32 scalar, got {} elements",
                what,
                other.len()
            ))),
        }
    }

    /// A non-negative int32 scalar used as an element count
    pub fn count(&mut self, what: &str) -> GatewayResult<usize> {
        let v = self.i32(what)?;
        usize::try_from(v).map_err(|_| self.mismatch(format!("{} must not be negative, got {}", what, v)))
    }

    /// A double matrix whose element count matches its declared shape
    pub fn matrix(&mut self, what: &str) -> GatewayResult<&'a Matrix> {
        let value = self.next(what)?;
        let m = value
            .as_matrix()
            .ok_or_else(|| self.wrong_type(what, "double", value))?;
        if !m.is_consistent() {
            return Err(self.mismatch(format!(
                "{} is declared {}x{} but holds {} elements",
                what,
                m.rows,
                m.cols,
                m.data.len()
            )));
        }
        Ok(m)
    }

    /// Flat float buffer in storage order
    pub fn f64s(&mut self, what: &str) -> GatewayResult<&'a [f64]> {
        Ok(&self.matrix(what)?.data)
    }

    /// A float scalar (1x1 matrix)
    pub fn f64(&mut self, what: &str) -> GatewayResult<f64> {
        let m = self.matrix(what)?;
        match (m.is_scalar(), m.data.first()) {
            (true, Some(v)) => Ok(*v),
            _ => Err(self.mismatch(format!(
                "{} must be a double scalar, got {}x{}",
                what, m.rows, m.cols
            ))),
        }
    }

    /// Reject trailing arguments
    pub fn finish(self) -> GatewayResult<()> {
        if self.pos < self.values.len() {
            return Err(self.mismatch(format!(
                "expected {} arguments, got {}",
                self.pos - 1,
                self.values.len() - 1
            )));
        }
        Ok(())
    }
}

/// Check a buffer length against the length implied by an explicit count
pub fn expect_len(
    operation: Operation,
    what: &str,
    expected: usize,
    actual: usize,
) -> GatewayResult<()> {
    if expected != actual {
        return Err(GatewayError::shape(
            operation,
            format!("{} must have {} elements, got {}", what, expected, actual),
        ));
    }
    Ok(())
}

/// Check that `len` values split into `count` equally sized records.
///
/// Needs no dimension, so it runs before the engine is consulted.
pub fn expect_records(
    operation: Operation,
    what: &str,
    count: usize,
    len: usize,
) -> GatewayResult<()> {
    let fits = if count == 0 { len == 0 } else { len % count == 0 };
    if !fits {
        return Err(GatewayError::shape(
            operation,
            format!("{} with {} elements cannot hold {} records", what, len, count),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP: Operation = Operation::SetMeshVertices;

    fn frame() -> Frame {
        Frame::call(
            44,
            [
                Value::str("Fluid-Mesh"),
                Value::int32(2),
                Value::floats(vec![0.0, 0.0, 1.0, 0.0]),
            ],
        )
    }

    #[test]
    fn test_reads_positionally() {
        let frame = frame();
        let mut r = FrameReader::new(OP, 44, &frame, true).unwrap();
        assert_eq!(r.str("mesh").unwrap(), "Fluid-Mesh");
        assert_eq!(r.count("size").unwrap(), 2);
        assert_eq!(r.f64s("positions").unwrap(), &[0.0, 0.0, 1.0, 0.0]);
        r.finish().unwrap();
    }

    #[test]
    fn test_opcode_echo() {
        let frame = frame();
        assert!(FrameReader::new(OP, 43, &frame, true).is_err());
        assert!(FrameReader::new(OP, 43, &frame, false).is_ok());
        assert!(FrameReader::new(OP, 44, &Frame::empty(), false).is_err());
    }

    #[test]
    fn test_wrong_type_is_shape_mismatch() {
        let frame = frame();
        let mut r = FrameReader::new(OP, 44, &frame, true).unwrap();
        let err = r.i32("mesh").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument shape mismatch in SetMeshVertices: mesh at position 1 must be int32, got string"
        );
    }

    #[test]
    fn test_missing_and_extra_arguments() {
        let frame = Frame::call(11, [Value::float64(0.1), Value::float64(0.2)]);
        let mut r = FrameReader::new(Operation::Advance, 11, &frame, true).unwrap();
        r.f64("dt").unwrap();
        assert!(matches!(
            r.finish(),
            Err(GatewayError::ArgumentShapeMismatch { .. })
        ));

        let frame = Frame::call(11, []);
        let mut r = FrameReader::new(Operation::Advance, 11, &frame, true).unwrap();
        assert!(r.f64("dt").is_err());
    }

    #[test]
    fn test_scalar_checks() {
        let frame = Frame::call(
            11,
            [Value::floats(vec![0.1, 0.2]), Value::Int32(vec![-1])],
        );
        let mut r = FrameReader::new(Operation::Advance, 11, &frame, true).unwrap();
        assert!(r.f64("dt").is_err());
        assert!(r.count("size").is_err());
    }

    #[test]
    fn test_matrix_shape_must_match_data() {
        let empty_scalar = Matrix {
            rows: 1,
            cols: 1,
            data: vec![],
        };
        let frame = Frame::call(11, [Value::Float64(empty_scalar)]);
        let mut r = FrameReader::new(Operation::Advance, 11, &frame, true).unwrap();
        assert!(matches!(
            r.f64("dt"),
            Err(GatewayError::ArgumentShapeMismatch { .. })
        ));

        // A 2x5 matrix holding three values is not a three-element buffer
        let short = Matrix {
            rows: 2,
            cols: 5,
            data: vec![0.0, 1.0, 2.0],
        };
        let frame = Frame::call(44, [Value::str("Fluid-Mesh"), Value::int32(1), Value::Float64(short)]);
        let mut r = FrameReader::new(OP, 44, &frame, true).unwrap();
        r.str("mesh").unwrap();
        r.count("size").unwrap();
        let err = r.f64s("positions").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument shape mismatch in SetMeshVertices: positions is declared 2x5 but holds 3 elements"
        );
    }

    #[test]
    fn test_expect_len() {
        assert!(expect_len(OP, "positions", 4, 4).is_ok());
        assert!(expect_len(OP, "positions", 6, 4).is_err());
    }

    #[test]
    fn test_expect_records() {
        assert!(expect_records(OP, "values", 2, 6).is_ok());
        assert!(expect_records(OP, "values", 5, 12).is_err());
        assert!(expect_records(OP, "values", 0, 0).is_ok());
        assert!(expect_records(OP, "values", 0, 3).is_err());
    }
}
